use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;
pub const JOIN_CODE_LEN: usize = 6;
pub const START_EPOCH: &str = "startEpoch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: String,
    pub join_code: String,
    pub state: Value,
}

impl Household {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            join_code: generate_join_code(),
            state: empty_state(),
        }
    }

    /// Moves the rotation start one week into the past and returns the new start.
    ///
    /// `None` leaves the state untouched: it is not an object, or `startEpoch` is not an integer.
    pub fn rotate_now(&mut self) -> Option<i64> {
        let state = self.state.as_object_mut()?;

        let rotated = state
            .get(START_EPOCH)
            .and_then(Value::as_i64)
            .and_then(|epoch| epoch.checked_sub(WEEK_MS))?;

        state.insert(START_EPOCH.to_string(), json!(rotated));

        Some(rotated)
    }
}

impl Default for Household {
    fn default() -> Self {
        Self::new()
    }
}

pub fn empty_state() -> Value {
    json!({
        "roommates": [],
        "chores": [],
        "startEpoch": null,
        "doneByWeek": {}
    })
}

pub fn generate_join_code() -> String {
    let mut rng = rand::rng();

    (0..JOIN_CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
