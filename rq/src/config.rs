//! Reads the process environment into an [`EvaluationOptions`] the way
//! `spareval`'s embedders typically wire up a `QueryEvaluator` from CLI
//! flags or env vars, except here the reading itself happens once, in this
//! crate, rather than being left to every caller — `rq-eval` stays
//! environment-agnostic and pure-library per §1/§6 so it can be embedded
//! somewhere that doesn't use `std::env` at all (e.g. compiled to run inside
//! another process's sandboxed config system).
use std::env;

use rq_eval::EvaluationOptions;

/// Configuration resolved once from the process environment (§6):
/// `NO_NET`, `RAND_SEED`, and `TZ`. `TZ` is recorded verbatim rather than
/// parsed here — it's only consulted by `rq-model`'s `timegm` emulation on
/// platforms lacking a native one, a detail this facade doesn't second-guess.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub no_net: bool,
    pub rand_seed: Option<u64>,
    pub timezone: Option<String>,
}

impl Config {
    /// Reads `NO_NET`, `RAND_SEED`, and `TZ` from the process environment.
    /// `NO_NET` is "set" per §6's boolean convention: present and not empty,
    /// not `"0"`, and not `"false"` (case-insensitive) — the same loose
    /// truthiness most `NO_*`-style env flags in the Rust ecosystem use
    /// rather than requiring an exact `"1"`/`"true"`.
    pub fn from_env() -> Self {
        Self {
            no_net: env::var("NO_NET").is_ok_and(|v| is_truthy(&v)),
            rand_seed: env::var("RAND_SEED").ok().and_then(|v| v.parse().ok()),
            timezone: env::var("TZ").ok(),
        }
    }

    /// Builds an [`EvaluationOptions`] seeded from this configuration, with
    /// `timeout`/`now` left at their defaults for the caller to layer on
    /// afterward (this struct only ever carries what §6 enumerates as
    /// environment-sourced).
    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions {
            no_net: self.no_net,
            rand_seed: self.rand_seed,
            ..EvaluationOptions::default()
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && !value.eq_ignore_ascii_case("0") && !value.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_are_recognized() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("FALSE"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn evaluation_options_carries_seed_and_no_net() {
        let config = Config {
            no_net: true,
            rand_seed: Some(42),
            timezone: None,
        };
        let options = config.evaluation_options();
        assert!(options.no_net);
        assert_eq!(options.rand_seed, Some(42));
    }
}
