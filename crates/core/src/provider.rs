//! Log-context provider contract and registration lifecycle
//!
//! Each logging backend gets one provider implementation, selected at
//! startup configuration. The hook wrapping a provider is deliberately
//! forgiving: a backend that refuses the registration (or is absent
//! entirely) leaves the application logging without correlation, never
//! broken.

use std::sync::Mutex;

use crate::config::InjectionConfig;

/// Registration state of an [`InjectionHook`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookState {
    Unregistered,
    Registered,
}

/// Bridge between the trace-context accessor and one logging backend
pub trait LogContextProvider: Send + Sync {
    /// Name of the logging backend this provider feeds (diagnostics only)
    fn backend(&self) -> &str;

    /// Attach to the backend's extension point.
    ///
    /// Returns `false` when the backend refuses the registration, for
    /// example because a global subscriber is already installed. Must not
    /// panic: injection is an optional enhancement.
    fn register(&self) -> bool;

    /// Detach from the backend. Called at most once per successful
    /// [`register`](Self::register). Best effort.
    fn deregister(&self) {}
}

/// Owns a provider and drives its registration state machine
///
/// Transitions are `Unregistered -> Registered` on [`install`] and back on
/// [`uninstall`]; both operations are idempotent and thread-safe.
///
/// [`install`]: InjectionHook::install
/// [`uninstall`]: InjectionHook::uninstall
pub struct InjectionHook {
    provider: Box<dyn LogContextProvider>,
    enabled: bool,
    state: Mutex<HookState>,
}

impl InjectionHook {
    /// Wrap a provider with injection enabled
    pub fn new(provider: Box<dyn LogContextProvider>) -> Self {
        Self {
            provider,
            enabled: true,
            state: Mutex::new(HookState::Unregistered),
        }
    }

    /// Wrap a provider, honoring the config's master switch
    pub fn with_config(provider: Box<dyn LogContextProvider>, config: &InjectionConfig) -> Self {
        Self {
            provider,
            enabled: config.enabled,
            state: Mutex::new(HookState::Unregistered),
        }
    }

    /// Current registration state
    pub fn state(&self) -> HookState {
        *self.lock_state()
    }

    /// Register the provider with its backend.
    ///
    /// A duplicate install keeps the single existing registration. When
    /// injection is disabled, or the backend refuses, the hook simply
    /// stays unregistered.
    pub fn install(&self) -> HookState {
        let mut state = self.lock_state();

        if !self.enabled || *state == HookState::Registered {
            return *state;
        }

        if self.provider.register() {
            *state = HookState::Registered;
        } else {
            tracing::debug!(
                backend = self.provider.backend(),
                "log backend refused trace injection; logging proceeds without correlation"
            );
        }

        *state
    }

    /// Deregister the provider. A no-op when not registered.
    pub fn uninstall(&self) -> HookState {
        let mut state = self.lock_state();

        if *state == HookState::Registered {
            self.provider.deregister();
            *state = HookState::Unregistered;
        }

        *state
    }

    // A poisoned lock only means another thread panicked mid-transition;
    // the state itself is a plain enum and stays usable.
    fn lock_state(&self) -> std::sync::MutexGuard<'_, HookState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        accept: bool,
        registered: Arc<AtomicUsize>,
        deregistered: Arc<AtomicUsize>,
    }

    impl CountingProvider {
        fn new(accept: bool) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let registered = Arc::new(AtomicUsize::new(0));
            let deregistered = Arc::new(AtomicUsize::new(0));
            let provider = Self {
                accept,
                registered: registered.clone(),
                deregistered: deregistered.clone(),
            };
            (provider, registered, deregistered)
        }
    }

    impl LogContextProvider for CountingProvider {
        fn backend(&self) -> &str {
            "counting"
        }

        fn register(&self) -> bool {
            self.registered.fetch_add(1, Ordering::SeqCst);
            self.accept
        }

        fn deregister(&self) {
            self.deregistered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_install_is_idempotent() {
        let (provider, registered, _) = CountingProvider::new(true);
        let hook = InjectionHook::new(Box::new(provider));

        assert_eq!(hook.install(), HookState::Registered);
        assert_eq!(hook.install(), HookState::Registered);

        // A duplicate install keeps the single active registration
        assert_eq!(registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refused_registration_stays_unregistered() {
        let (provider, registered, _) = CountingProvider::new(false);
        let hook = InjectionHook::new(Box::new(provider));

        assert_eq!(hook.install(), HookState::Unregistered);
        assert_eq!(hook.state(), HookState::Unregistered);

        // Refusal is retryable
        hook.install();
        assert_eq!(registered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_config_is_a_noop() {
        let config = InjectionConfig {
            enabled: false,
            ..InjectionConfig::default()
        };
        let (provider, registered, _) = CountingProvider::new(true);
        let hook = InjectionHook::with_config(Box::new(provider), &config);

        assert_eq!(hook.install(), HookState::Unregistered);
        assert_eq!(registered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_uninstall_round_trip() {
        let (provider, _, deregistered) = CountingProvider::new(true);
        let hook = InjectionHook::new(Box::new(provider));

        // Uninstall before install is a no-op
        assert_eq!(hook.uninstall(), HookState::Unregistered);
        assert_eq!(deregistered.load(Ordering::SeqCst), 0);

        hook.install();
        assert_eq!(hook.uninstall(), HookState::Unregistered);
        assert_eq!(hook.uninstall(), HookState::Unregistered);
        assert_eq!(deregistered.load(Ordering::SeqCst), 1);

        // Can be installed again after a shutdown
        assert_eq!(hook.install(), HookState::Registered);
    }
}
