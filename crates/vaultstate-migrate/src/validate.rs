//! Structural checks applied to a step's output before it is accepted.
//!
//! These never look inside a controller; they only catch a step that lost
//! the state entirely or left it at the wrong version.

use serde_json::Value;

use crate::error::ShapeViolation;
use crate::state::PersistedState;

/// Check that `state` has data at all.
///
/// `null`, `false`, zero and the empty string all count as no data. An empty
/// object is still a state.
pub fn validate_state(state: &PersistedState) -> Result<(), ShapeViolation> {
    if is_empty_data(&state.data) {
        return Err(ShapeViolation::EmptyData);
    }
    Ok(())
}

fn is_empty_data(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Check the output of the step with version `step_version`.
pub fn validate_step_output(
    state: &PersistedState,
    step_version: u32,
) -> Result<(), ShapeViolation> {
    validate_state(state)?;
    if state.version() != step_version {
        return Err(ShapeViolation::VersionMismatch {
            expected: step_version,
            actual: state.version(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_state_at_step_version() {
        let state = PersistedState::from_value(json!({ "a": 1 }), 4);
        assert_eq!(validate_step_output(&state, 4), Ok(()));
    }

    #[test]
    fn empty_object_is_still_state() {
        let state = PersistedState::from_value(json!({}), 4);
        assert_eq!(validate_step_output(&state, 4), Ok(()));
    }

    #[test]
    fn null_data_rejected() {
        let state = PersistedState::from_value(Value::Null, 4);
        assert_eq!(validate_state(&state), Err(ShapeViolation::EmptyData));
        assert_eq!(validate_step_output(&state, 4), Err(ShapeViolation::EmptyData));
    }

    #[test]
    fn falsy_scalars_rejected() {
        for data in [json!(""), json!(false), json!(0), json!(0.0), json!(-0.0)] {
            let state = PersistedState::from_value(data.clone(), 4);
            assert_eq!(
                validate_step_output(&state, 4),
                Err(ShapeViolation::EmptyData),
                "{data}"
            );
        }
    }

    #[test]
    fn truthy_scalars_and_arrays_accepted() {
        for data in [json!("x"), json!(true), json!(1), json!([])] {
            let state = PersistedState::from_value(data, 4);
            assert_eq!(validate_state(&state), Ok(()));
        }
    }

    #[test]
    fn version_behind_rejected() {
        let state = PersistedState::from_value(json!({}), 3);
        assert_eq!(
            validate_step_output(&state, 4),
            Err(ShapeViolation::VersionMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn version_ahead_rejected() {
        let state = PersistedState::from_value(json!({}), 6);
        assert_eq!(
            validate_step_output(&state, 4),
            Err(ShapeViolation::VersionMismatch {
                expected: 4,
                actual: 6
            })
        );
    }
}
