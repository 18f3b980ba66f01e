mod support;

use std::time::Duration;

use axon::{error::Error, update::lock::UpdateLock};
use support::init_home;

#[test]
fn lock_is_exclusive_and_released_on_drop() {
   init_home();

   let first = UpdateLock::acquire(Duration::ZERO).expect("first acquisition");

   match UpdateLock::acquire(Duration::ZERO) {
      Err(Error::UpdateInProgress { lock }) => {
         assert!(lock.ends_with("update.lock"), "lock path: {}", lock.display());
      },
      Err(e) => panic!("expected UpdateInProgress, got {e}"),
      Ok(_) => panic!("second acquisition should have failed"),
   }

   drop(first);
   let _third = UpdateLock::acquire(Duration::ZERO).expect("reacquire after release");
}
