//! Price alert definitions.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert identifier, assigned by the store on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub i64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlertId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(AlertId)
            .map_err(|_| ValidationError::InvalidAlertId(s.to_string()))
    }
}

/// Side of the target price an alert fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fires when price >= target.
    Above,
    /// Fires when price <= target.
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    /// Comparison sign used in chat replies.
    pub fn sign(self) -> &'static str {
        match self {
            Direction::Above => ">",
            Direction::Below => "<",
        }
    }

    /// Both boundaries are inclusive.
    #[inline]
    pub fn is_crossed(self, price: f64, target: f64) -> bool {
        match self {
            Direction::Above => price >= target,
            Direction::Below => price <= target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(ValidationError::InvalidTarget(format!(
                "unknown direction '{}'",
                other
            ))),
        }
    }
}

/// A persisted price alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    /// Chat that receives the notification.
    pub chat_id: i64,
    /// Owner; only the owner may remove the alert.
    pub user_id: i64,
    /// Ticker as the user typed it, lowercased. Display only.
    pub symbol: String,
    /// Canonical uppercase ticker used for price lookups (e.g. "BTC").
    pub base_asset: String,
    pub target: f64,
    pub direction: Direction,
    /// Seconds since epoch.
    pub created_at: i64,
}

impl Alert {
    /// Whether `price` satisfies this alert's condition.
    #[inline]
    pub fn is_triggered(&self, price: f64) -> bool {
        self.direction.is_crossed(price, self.target)
    }
}

/// Parse a user-supplied target such as `"30000"` or `"<30000"`.
///
/// A leading `<` selects [`Direction::Below`]; otherwise the alert fires
/// above. A leading `>` is accepted and ignored. The value must be a
/// finite, positive number.
pub fn parse_target(raw: &str) -> Result<(f64, Direction), ValidationError> {
    let raw = raw.trim();
    let (direction, number) = if let Some(rest) = raw.strip_prefix('<') {
        (Direction::Below, rest)
    } else if let Some(rest) = raw.strip_prefix('>') {
        (Direction::Above, rest)
    } else {
        (Direction::Above, raw)
    };

    let target = number
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidTarget(raw.to_string()))?;

    if !target.is_finite() || target <= 0.0 {
        return Err(ValidationError::InvalidTarget(raw.to_string()));
    }

    Ok((target, direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alert(direction: Direction, target: f64) -> Alert {
        Alert {
            id: AlertId(1),
            chat_id: 10,
            user_id: 20,
            symbol: "btc".to_string(),
            base_asset: "BTC".to_string(),
            target,
            direction,
            created_at: 0,
        }
    }

    #[test]
    fn test_above_boundary_is_inclusive() {
        let a = alert(Direction::Above, 100.0);
        assert!(a.is_triggered(100.0));
        assert!(a.is_triggered(100.5));
        assert!(!a.is_triggered(99.999999));
    }

    #[test]
    fn test_below_boundary_is_inclusive() {
        let a = alert(Direction::Below, 100.0);
        assert!(a.is_triggered(100.0));
        assert!(a.is_triggered(42.0));
        assert!(!a.is_triggered(100.000001));
    }

    #[test]
    fn test_nan_price_never_triggers() {
        assert!(!alert(Direction::Above, 1.0).is_triggered(f64::NAN));
        assert!(!alert(Direction::Below, 1.0).is_triggered(f64::NAN));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("30000").unwrap(), (30000.0, Direction::Above));
        assert_eq!(parse_target("<30000").unwrap(), (30000.0, Direction::Below));
        assert_eq!(parse_target(">0.5").unwrap(), (0.5, Direction::Above));
        assert_eq!(parse_target(" < 1e3 ").unwrap(), (1000.0, Direction::Below));
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert!(matches!(
            parse_target("abc"),
            Err(ValidationError::InvalidTarget(_))
        ));
        assert!(parse_target("<").is_err());
        assert!(parse_target("0").is_err());
        assert!(parse_target("-5").is_err());
        assert!(parse_target("inf").is_err());
        assert!(parse_target("NaN").is_err());
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("above".parse::<Direction>().unwrap(), Direction::Above);
        assert_eq!("BELOW".parse::<Direction>().unwrap(), Direction::Below);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::Below.to_string(), "below");
        assert_eq!(Direction::Below.sign(), "<");
    }

    #[test]
    fn test_alert_id_from_str() {
        assert_eq!("42".parse::<AlertId>().unwrap(), AlertId(42));
        assert_eq!(" 7 ".parse::<AlertId>().unwrap(), AlertId(7));
        assert!("seven".parse::<AlertId>().is_err());
    }
}
