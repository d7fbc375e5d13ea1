use std::{cell::RefCell, ffi::OsStr};

/// Clock frequency used when neither `--hz` nor `HYDRAZEN_HZ` is given.
pub const DEFAULT_HZ: f64 = 60.0;

#[derive(Clone, Copy)]
struct Env {
    default_hz: f64,
    force_minimal: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        default_hz: var_hz("HYDRAZEN_HZ").unwrap_or(DEFAULT_HZ),
        force_minimal: var_is("HYDRAZEN_MINIMAL", "1"),
    };
    set_env(value);
}

pub fn default_hz() -> f64 {
    with_env(|env| env.default_hz)
}

pub fn is_minimal_forced() -> bool {
    with_env(|env| env.force_minimal)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

/// Unparseable or non-positive values are ignored.
fn var_hz(name: impl AsRef<OsStr>) -> Option<f64> {
    let value = std::env::var(name.as_ref()).ok()?;
    match value.trim().parse::<f64>() {
        Ok(hz) if hz.is_finite() && hz > 0.0 => Some(hz),
        _ => {
            log::warn!("Ignoring invalid {:?} value `{value}`", name.as_ref());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hz_from_variable() {
        std::env::set_var("HYDRAZEN_TEST_HZ_OK", "120.5");
        assert_eq!(var_hz("HYDRAZEN_TEST_HZ_OK"), Some(120.5));
        std::env::set_var("HYDRAZEN_TEST_HZ_BAD", "fast");
        assert_eq!(var_hz("HYDRAZEN_TEST_HZ_BAD"), None);
        std::env::set_var("HYDRAZEN_TEST_HZ_NEG", "-3");
        assert_eq!(var_hz("HYDRAZEN_TEST_HZ_NEG"), None);
        assert_eq!(var_hz("HYDRAZEN_TEST_HZ_UNSET"), None);
    }

    #[test]
    fn init_once_per_thread() {
        std::thread::spawn(|| {
            init();
            assert!(default_hz() > 0.0);
        })
        .join()
        .unwrap();
    }
}
