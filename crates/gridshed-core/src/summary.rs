// Ensemble-inventory reduction.
//
// The raw payload is a list of device-group objects, each with a `type`
// and a `devices` list. Two groups matter: ENPOWER (grid-tie controller,
// reports `mains_oper_state`) and ENCHARGE (battery bank, each device
// reports `percentFull`).

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// Utility grid connection state as reported by the grid-tie controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GridStatus {
    Up,
    Down,
}

impl std::fmt::Display for GridStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Reduced health summary for one poll. Ephemeral -- recomputed every
/// cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub grid_status: GridStatus,
    /// Per-battery charge percentages, in the order the gateway lists
    /// them. Order is significant for rendering.
    pub battery_levels: Vec<i64>,
    pub battery_level_avg: f64,
}

impl InventorySummary {
    /// The two-line rendering the observability sink emits:
    /// grid status label, then the average with the ordered per-device
    /// list in brackets.
    pub fn render(&self) -> String {
        let levels: Vec<String> = self.battery_levels.iter().map(ToString::to_string).collect();
        format!(
            "Grid: {}\nBattery Level: {:.1} [{}]",
            self.grid_status,
            self.battery_level_avg,
            levels.join(", "),
        )
    }
}

/// Reduce a raw ensemble-inventory payload to an [`InventorySummary`].
///
/// Pure and deterministic: identical input yields identical output.
pub fn reduce(raw: &Value) -> Result<InventorySummary, CoreError> {
    let groups: &[Value] = raw.as_array().map_or(&[], Vec::as_slice);

    let enpower = find_group(groups, "ENPOWER")?;
    // Grid status comes from the *first* device of the ENPOWER record.
    // Multi-gateway sites are unsupported; their behavior is unspecified.
    let mains_oper_state = enpower
        .get("devices")
        .and_then(Value::as_array)
        .and_then(|devices| devices.first())
        .and_then(|device| device.get("mains_oper_state"))
        .and_then(Value::as_str);
    let grid_status = if mains_oper_state == Some("closed") {
        GridStatus::Up
    } else {
        GridStatus::Down
    };

    let encharge = find_group(groups, "ENCHARGE")?;
    let devices: &[Value] = encharge
        .get("devices")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice);

    let mut battery_levels = Vec::with_capacity(devices.len());
    for device in devices {
        battery_levels.push(percent_full(device)?);
    }

    if battery_levels.is_empty() {
        return Err(CoreError::NoBatteries);
    }
    #[allow(clippy::cast_precision_loss)]
    let battery_level_avg =
        battery_levels.iter().sum::<i64>() as f64 / battery_levels.len() as f64;

    Ok(InventorySummary {
        grid_status,
        battery_levels,
        battery_level_avg,
    })
}

fn find_group<'a>(groups: &'a [Value], device: &str) -> Result<&'a Value, CoreError> {
    groups
        .iter()
        .find(|g| g.get("type").and_then(Value::as_str) == Some(device))
        .ok_or_else(|| CoreError::MissingDevice {
            device: device.to_owned(),
        })
}

/// Coerce a battery device's `percentFull` to an integer. The gateway
/// reports it as a string on some firmware and a number on others.
fn percent_full(device: &Value) -> Result<i64, CoreError> {
    let value = device
        .get("percentFull")
        .ok_or_else(|| CoreError::BatteryField {
            reason: "device has no percentFull field".into(),
        })?;

    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| CoreError::BatteryField {
            reason: format!("percentFull is not an integer: {n}"),
        }),
        Value::String(s) => s.trim().parse().map_err(|_| CoreError::BatteryField {
            reason: format!("percentFull is not an integer: {s:?}"),
        }),
        other => Err(CoreError::BatteryField {
            reason: format!("percentFull is not an integer: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn grid_up_two_batteries() -> Value {
        json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
            {"type": "ENCHARGE", "devices": [{"percentFull": "80"}, {"percentFull": "60"}]},
        ])
    }

    #[test]
    fn reduces_grid_up_scenario() {
        let summary = reduce(&grid_up_two_batteries()).expect("reduce");
        assert_eq!(summary.grid_status, GridStatus::Up);
        assert_eq!(summary.battery_levels, vec![80, 60]);
        assert!((summary.battery_level_avg - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_mains_is_grid_down() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "open"}]},
            {"type": "ENCHARGE", "devices": [{"percentFull": "80"}, {"percentFull": "60"}]},
        ]);
        let summary = reduce(&raw).expect("reduce");
        assert_eq!(summary.grid_status, GridStatus::Down);
    }

    #[test]
    fn is_deterministic() {
        let raw = grid_up_two_batteries();
        assert_eq!(reduce(&raw).expect("first"), reduce(&raw).expect("second"));
    }

    #[test]
    fn missing_enpower_entry() {
        let raw = json!([
            {"type": "ENCHARGE", "devices": [{"percentFull": "80"}]},
        ]);
        match reduce(&raw) {
            Err(CoreError::MissingDevice { device }) => assert_eq!(device, "ENPOWER"),
            other => panic!("expected MissingDevice(ENPOWER), got: {other:?}"),
        }
    }

    #[test]
    fn missing_encharge_entry() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
        ]);
        match reduce(&raw) {
            Err(CoreError::MissingDevice { device }) => assert_eq!(device, "ENCHARGE"),
            other => panic!("expected MissingDevice(ENCHARGE), got: {other:?}"),
        }
    }

    #[test]
    fn empty_battery_bank_is_an_error() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
            {"type": "ENCHARGE", "devices": []},
        ]);
        assert!(matches!(reduce(&raw), Err(CoreError::NoBatteries)));
    }

    #[test]
    fn uncoercible_percent_full_is_an_error() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
            {"type": "ENCHARGE", "devices": [{"percentFull": "full-ish"}]},
        ]);
        assert!(matches!(reduce(&raw), Err(CoreError::BatteryField { .. })));
    }

    #[test]
    fn numeric_percent_full_is_accepted() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
            {"type": "ENCHARGE", "devices": [{"percentFull": 55}]},
        ]);
        let summary = reduce(&raw).expect("reduce");
        assert_eq!(summary.battery_levels, vec![55]);
    }

    #[test]
    fn level_order_is_preserved() {
        let raw = json!([
            {"type": "ENPOWER", "devices": [{"mains_oper_state": "closed"}]},
            {"type": "ENCHARGE", "devices": [
                {"percentFull": "10"}, {"percentFull": "90"}, {"percentFull": "40"},
            ]},
        ]);
        let summary = reduce(&raw).expect("reduce");
        assert_eq!(summary.battery_levels, vec![10, 90, 40]);
    }

    #[test]
    fn renders_two_lines() {
        let summary = reduce(&grid_up_two_batteries()).expect("reduce");
        assert_eq!(summary.render(), "Grid: UP\nBattery Level: 70.0 [80, 60]");
    }
}
