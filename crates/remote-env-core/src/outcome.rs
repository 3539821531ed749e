//! Decoded simulation results.

use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Observation returned by the simulation. Its shape is owned by the server.
pub type Observation = Value;

/// Free-form metadata attached to a result.
pub type Info = Map<String, Value>;

/// Plain tuple form of a result.
pub type EnvResultTuple = (Observation, f64, bool, Info);

/// One `(observation, reward, done, info)` result.
///
/// On the wire this is a JSON array of exactly four elements.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    /// The episode has terminated and the session is no longer valid.
    pub done: bool,
    pub info: Info,
}

impl StepOutcome {
    #[must_use]
    pub const fn new(observation: Observation, reward: f64, done: bool, info: Info) -> Self {
        Self {
            observation,
            reward,
            done,
            info,
        }
    }

    /// Decode an opaque result payload.
    ///
    /// # Errors
    /// Returns error if the payload is not a valid 4-tuple.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let (observation, reward, done, info): EnvResultTuple = serde_json::from_slice(payload)?;
        Ok(Self::new(observation, reward, done, info))
    }

    /// Encode into an opaque result payload.
    ///
    /// # Errors
    /// Returns error if the observation cannot be serialized.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let tuple = (&self.observation, self.reward, self.done, &self.info);
        Ok(serde_json::to_vec(&tuple)?)
    }

    /// Split into the plain tuple.
    #[must_use]
    pub fn into_parts(self) -> EnvResultTuple {
        (self.observation, self.reward, self.done, self.info)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_tuple() {
        let outcome = StepOutcome::decode(br#"[[0, 0], 0.0, false, {}]"#).unwrap();
        assert_eq!(outcome.observation, json!([0, 0]));
        assert!(outcome.reward.abs() < f64::EPSILON);
        assert!(!outcome.done);
        assert!(outcome.info.is_empty());
    }

    #[test]
    fn test_decode_keeps_info() {
        let outcome =
            StepOutcome::decode(br#"[{"ball": [0.1, 0.2]}, -1, true, {"score": [0, 1]}]"#)
                .unwrap();
        assert!(outcome.done);
        assert!((outcome.reward + 1.0).abs() < f64::EPSILON);
        assert_eq!(outcome.info.get("score"), Some(&json!([0, 1])));
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        assert!(StepOutcome::decode(br#"[[0, 0], 0.0, false]"#).is_err());
        assert!(StepOutcome::decode(b"not json").is_err());
    }

    #[test]
    fn test_encoded_shape() {
        let outcome = StepOutcome::new(json!([1, 1]), 1.0, true, Info::new());
        let encoded: Value = serde_json::from_slice(&outcome.encode().unwrap()).unwrap();
        assert_eq!(encoded, json!([[1, 1], 1.0, true, {}]));
    }
}
