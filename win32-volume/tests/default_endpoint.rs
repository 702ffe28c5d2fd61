//! Exercises the real default output device.
//!
//! These tests change the system volume and mute state (restoring them
//! afterwards) and need an audio output device, so they are ignored by
//! default: `cargo test -- --ignored`.

#![cfg(windows)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use win32_volume::{
    DefaultEndpointProvider, DispatcherOptions, VolumeController, VolumeDispatcher,
};

fn controller() -> VolumeController<DefaultEndpointProvider> {
    VolumeController::new(DefaultEndpointProvider::new())
}

#[test]
#[ignore]
fn level_and_mute_round_trip() -> anyhow::Result<()> {
    let ctrl = controller();
    let original_level = ctrl.get_volume()?;
    let original_mute = ctrl.get_mute()?;

    ctrl.set_volume(0.5)?;
    assert!((ctrl.get_volume()? - 0.5).abs() < 0.01);

    ctrl.set_mute(true)?;
    assert!(ctrl.get_mute()?);
    ctrl.set_mute(false)?;
    assert!(!ctrl.get_mute()?);

    ctrl.set_volume(original_level)?;
    ctrl.set_mute(original_mute)?;
    Ok(())
}

#[test]
#[ignore]
fn async_set_volume_completes_on_caller() -> anyhow::Result<()> {
    let dispatcher = VolumeDispatcher::new(controller(), DispatcherOptions::default())?;
    let original_level = dispatcher.controller().get_volume()?;
    let target = if original_level > 0.5 { 0.25 } else { 0.75 };

    let calls: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&calls);
    dispatcher.set_volume(target, Some(Box::new(move |ok: bool| record.borrow_mut().push(ok))))?;
    assert!(dispatcher.run_until_idle(Duration::from_secs(10)));

    assert_eq!(*calls.borrow(), vec![true]);
    assert!((dispatcher.controller().get_volume()? - target).abs() < 0.01);

    dispatcher.controller().set_volume(original_level)?;
    Ok(())
}
