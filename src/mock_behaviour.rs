//! This module provides ways to tweak the in-memory store, so that it can return errors on some tests

use crate::error::StoreError;

/// This stores some behaviour tweaks, that describe how a [`MemoryStore`](crate::store::memory::MemoryStore) will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the ScheduleSource trait
    pub fetch_behaviour: (u32, u32),

    // From the ScheduleStore trait
    pub create_behaviour: (u32, u32),
    pub update_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actions will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            fetch_behaviour: (0, n_fails),
            create_behaviour: (0, n_fails),
            update_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_fetch(&mut self) -> Result<(), StoreError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_behaviour, "fetch")
    }
    pub fn can_create(&mut self) -> Result<(), StoreError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_behaviour, "create")
    }
    pub fn can_update(&mut self) -> Result<(), StoreError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_behaviour, "update")
    }
    pub fn can_delete(&mut self) -> Result<(), StoreError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_behaviour, "delete")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), StoreError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(StoreError::Backend(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        for _ in 0..5 {
            assert!(ok.can_fetch().is_ok());
        }

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_fetch().is_err());
        assert!(now.can_create().is_err());
        assert!(now.can_create().is_err());
        assert!(now.can_fetch().is_err());
        assert!(now.can_fetch().is_ok());
        assert!(now.can_create().is_ok());

        let mut custom = MockBehaviour{
            fetch_behaviour: (0,1),
            delete_behaviour: (1,2),
            ..MockBehaviour::default()
        };
        assert!(custom.can_fetch().is_err());
        assert!(custom.can_fetch().is_ok());
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_delete().is_err());
        custom.suspend();
        assert!(custom.can_delete().is_ok());
        custom.resume();
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_ok());
    }
}
