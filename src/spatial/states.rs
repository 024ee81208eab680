//! U.S. state lookup by name, postal abbreviation, or FIPS code.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown state: '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct State {
    pub name: &'static str,
    pub abbr: &'static str,
    pub fips: &'static str,
}

// Census FIPS codes for the states, DC, and Puerto Rico.
const STATES: [State; 52] = [
    State { name: "Alabama", abbr: "AL", fips: "01" },
    State { name: "Alaska", abbr: "AK", fips: "02" },
    State { name: "Arizona", abbr: "AZ", fips: "04" },
    State { name: "Arkansas", abbr: "AR", fips: "05" },
    State { name: "California", abbr: "CA", fips: "06" },
    State { name: "Colorado", abbr: "CO", fips: "08" },
    State { name: "Connecticut", abbr: "CT", fips: "09" },
    State { name: "Delaware", abbr: "DE", fips: "10" },
    State { name: "District of Columbia", abbr: "DC", fips: "11" },
    State { name: "Florida", abbr: "FL", fips: "12" },
    State { name: "Georgia", abbr: "GA", fips: "13" },
    State { name: "Hawaii", abbr: "HI", fips: "15" },
    State { name: "Idaho", abbr: "ID", fips: "16" },
    State { name: "Illinois", abbr: "IL", fips: "17" },
    State { name: "Indiana", abbr: "IN", fips: "18" },
    State { name: "Iowa", abbr: "IA", fips: "19" },
    State { name: "Kansas", abbr: "KS", fips: "20" },
    State { name: "Kentucky", abbr: "KY", fips: "21" },
    State { name: "Louisiana", abbr: "LA", fips: "22" },
    State { name: "Maine", abbr: "ME", fips: "23" },
    State { name: "Maryland", abbr: "MD", fips: "24" },
    State { name: "Massachusetts", abbr: "MA", fips: "25" },
    State { name: "Michigan", abbr: "MI", fips: "26" },
    State { name: "Minnesota", abbr: "MN", fips: "27" },
    State { name: "Mississippi", abbr: "MS", fips: "28" },
    State { name: "Missouri", abbr: "MO", fips: "29" },
    State { name: "Montana", abbr: "MT", fips: "30" },
    State { name: "Nebraska", abbr: "NE", fips: "31" },
    State { name: "Nevada", abbr: "NV", fips: "32" },
    State { name: "New Hampshire", abbr: "NH", fips: "33" },
    State { name: "New Jersey", abbr: "NJ", fips: "34" },
    State { name: "New Mexico", abbr: "NM", fips: "35" },
    State { name: "New York", abbr: "NY", fips: "36" },
    State { name: "North Carolina", abbr: "NC", fips: "37" },
    State { name: "North Dakota", abbr: "ND", fips: "38" },
    State { name: "Ohio", abbr: "OH", fips: "39" },
    State { name: "Oklahoma", abbr: "OK", fips: "40" },
    State { name: "Oregon", abbr: "OR", fips: "41" },
    State { name: "Pennsylvania", abbr: "PA", fips: "42" },
    State { name: "Rhode Island", abbr: "RI", fips: "44" },
    State { name: "South Carolina", abbr: "SC", fips: "45" },
    State { name: "South Dakota", abbr: "SD", fips: "46" },
    State { name: "Tennessee", abbr: "TN", fips: "47" },
    State { name: "Texas", abbr: "TX", fips: "48" },
    State { name: "Utah", abbr: "UT", fips: "49" },
    State { name: "Vermont", abbr: "VT", fips: "50" },
    State { name: "Virginia", abbr: "VA", fips: "51" },
    State { name: "Washington", abbr: "WA", fips: "53" },
    State { name: "West Virginia", abbr: "WV", fips: "54" },
    State { name: "Wisconsin", abbr: "WI", fips: "55" },
    State { name: "Wyoming", abbr: "WY", fips: "56" },
    State { name: "Puerto Rico", abbr: "PR", fips: "72" },
];

impl State {
    /// Resolve a full name (any case), postal abbreviation, or FIPS code.
    ///
    /// Single-digit FIPS codes may be given without the leading zero.
    pub fn lookup(query: &str) -> Result<State, StateError> {
        let q = query.trim();
        let fips = match q.len() {
            1 if q.chars().all(|c| c.is_ascii_digit()) => format!("0{q}"),
            _ => q.to_string(),
        };

        STATES
            .iter()
            .find(|s| {
                s.fips == fips || s.abbr.eq_ignore_ascii_case(q) || s.name.eq_ignore_ascii_case(q)
            })
            .copied()
            .ok_or_else(|| StateError::Unknown(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_abbr_and_fips() {
        for query in ["Washington", "washington", "WA", "wa", "53", " 53 "] {
            assert_eq!(State::lookup(query).unwrap().fips, "53", "query {query:?}");
        }
    }

    #[test]
    fn test_lookup_pads_single_digit_fips() {
        assert_eq!(State::lookup("6").unwrap().name, "California");
    }

    #[test]
    fn test_west_virginia_is_not_virginia() {
        assert_eq!(State::lookup("West Virginia").unwrap().fips, "54");
        assert_eq!(State::lookup("Virginia").unwrap().fips, "51");
    }

    #[test]
    fn test_unknown_state() {
        assert_eq!(
            State::lookup("Cascadia"),
            Err(StateError::Unknown("Cascadia".to_string()))
        );
    }
}
