use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MeasurementSystem {
    #[default]
    Metric,
    Imperial,
}

impl MeasurementSystem {
    /// Best guess from an IANA timezone name; the Americas get imperial.
    pub fn guess(timezone: Option<&str>) -> Self {
        match timezone {
            Some(tz) if tz.starts_with("America/") => MeasurementSystem::Imperial,
            _ => MeasurementSystem::Metric,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementSystem::Metric => "metric",
            MeasurementSystem::Imperial => "imperial",
        }
    }

    pub fn unit_directive(self) -> &'static str {
        match self {
            MeasurementSystem::Imperial => {
                "Use imperial units for ingredient quantities and instructions (oz, lb, cups, tbsp, tsp, F)."
            }
            MeasurementSystem::Metric => {
                "Use metric units for ingredient quantities and instructions (g, kg, ml, l, C)."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_from_timezone() {
        assert_eq!(MeasurementSystem::guess(Some("America/Chicago")), MeasurementSystem::Imperial);
        assert_eq!(MeasurementSystem::guess(Some("Europe/Berlin")), MeasurementSystem::Metric);
        assert_eq!(MeasurementSystem::guess(None), MeasurementSystem::Metric);
    }
}
