//! Navigation decision for one reconciliation cycle.
//!
//! The robot is sent somewhere only when all four facts line up:
//!
//! | Fact | Required |
//! |---|---|
//! | the cloud holds an expected location | yes |
//! | expected differs from observed | yes |
//! | observed location is `MOVING` | no |
//! | expected location is `UNKNOWN` | no |
//!
//! The decision is pure; dispatching the command is the reconciler's job.

use padbot_types::PropertyValue;

/// The four observations that feed the navigation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationFacts {
    pub has_target: bool,
    pub target_differs: bool,
    pub robot_moving: bool,
    pub target_unknown: bool,
}

impl NavigationFacts {
    /// Derive the facts from the cloud's expected location and the robot's
    /// observed location.  An absent target never "differs".
    pub fn observe(expected: Option<&PropertyValue>, observed: &PropertyValue) -> Self {
        Self {
            has_target: expected.is_some(),
            target_differs: expected.is_some_and(|target| !target.same_as(observed)),
            robot_moving: observed.is_moving(),
            target_unknown: expected.is_some_and(PropertyValue::is_unknown),
        }
    }

    pub fn requires_navigation(&self) -> bool {
        self.has_target && self.target_differs && !self.robot_moving && !self.target_unknown
    }
}

/// Why a cycle left the robot alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// The cloud has not asked for a location.
    NoTarget,
    /// The cloud asked for the `UNKNOWN` sentinel.
    UnknownTarget,
    /// The robot is already on its way somewhere.
    RobotMoving,
    /// The robot is where the cloud wants it.
    AlreadyThere,
}

/// Outcome of the navigation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Navigate { target: String },
    Hold(HoldReason),
}

impl NavigationDecision {
    pub fn is_navigate(&self) -> bool {
        matches!(self, NavigationDecision::Navigate { .. })
    }
}

/// Apply the navigation rule.
pub fn decide(expected: Option<&PropertyValue>, observed: &PropertyValue) -> NavigationDecision {
    let facts = NavigationFacts::observe(expected, observed);
    match expected {
        Some(target) if facts.requires_navigation() => NavigationDecision::Navigate {
            target: target.to_wire_string(),
        },
        _ if !facts.has_target => NavigationDecision::Hold(HoldReason::NoTarget),
        _ if facts.target_unknown => NavigationDecision::Hold(HoldReason::UnknownTarget),
        _ if facts.robot_moving => NavigationDecision::Hold(HoldReason::RobotMoving),
        _ => NavigationDecision::Hold(HoldReason::AlreadyThere),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padbot_types::StatusToken;

    #[test]
    fn only_one_of_sixteen_combinations_navigates() {
        let mut navigating = Vec::new();
        for bits in 0u8..16 {
            let facts = NavigationFacts {
                has_target: bits & 0b0001 != 0,
                target_differs: bits & 0b0010 != 0,
                robot_moving: bits & 0b0100 != 0,
                target_unknown: bits & 0b1000 != 0,
            };
            if facts.requires_navigation() {
                navigating.push(facts);
            }
        }
        assert_eq!(
            navigating,
            vec![NavigationFacts {
                has_target: true,
                target_differs: true,
                robot_moving: false,
                target_unknown: false,
            }]
        );
    }

    #[test]
    fn decide_navigates_only_to_a_known_differing_target() {
        let targets = [
            None,
            Some(PropertyValue::from("DockA")),
            Some(PropertyValue::unknown()),
        ];
        let observations = [
            PropertyValue::from("Lobby"),
            PropertyValue::from("DockA"),
            PropertyValue::Token(StatusToken::Moving),
            PropertyValue::unknown(),
        ];

        let mut navigating = Vec::new();
        for target in &targets {
            for observed in &observations {
                let decision = decide(target.as_ref(), observed);
                let facts = NavigationFacts::observe(target.as_ref(), observed);
                assert_eq!(
                    decision.is_navigate(),
                    facts.requires_navigation(),
                    "{target:?} vs {observed:?}"
                );
                if let NavigationDecision::Navigate { target: dest } = decision {
                    navigating.push((dest, observed.to_wire_string()));
                }
            }
        }
        assert_eq!(
            navigating,
            vec![
                ("DockA".to_string(), "Lobby".to_string()),
                ("DockA".to_string(), "UNKNOWN".to_string()),
            ]
        );
    }

    #[test]
    fn different_target_navigates() {
        let target = PropertyValue::from("DockA");
        let decision = decide(Some(&target), &PropertyValue::from("Lobby"));
        assert_eq!(
            decision,
            NavigationDecision::Navigate {
                target: "DockA".to_string()
            }
        );
    }

    #[test]
    fn same_location_holds() {
        let target = PropertyValue::from("DockA");
        let decision = decide(Some(&target), &PropertyValue::from("DockA"));
        assert_eq!(decision, NavigationDecision::Hold(HoldReason::AlreadyThere));
    }

    #[test]
    fn missing_target_holds() {
        let decision = decide(None, &PropertyValue::from("Lobby"));
        assert_eq!(decision, NavigationDecision::Hold(HoldReason::NoTarget));
    }

    #[test]
    fn moving_robot_holds() {
        let target = PropertyValue::from("DockA");
        let decision = decide(Some(&target), &PropertyValue::Token(StatusToken::Moving));
        assert_eq!(decision, NavigationDecision::Hold(HoldReason::RobotMoving));
    }

    #[test]
    fn unknown_target_holds() {
        let target = PropertyValue::unknown();
        let decision = decide(Some(&target), &PropertyValue::from("Lobby"));
        assert_eq!(decision, NavigationDecision::Hold(HoldReason::UnknownTarget));
    }

    #[test]
    fn numeric_target_compares_by_rendering() {
        let target = PropertyValue::Number(3.0);
        let facts = NavigationFacts::observe(Some(&target), &PropertyValue::from("3"));
        assert!(!facts.target_differs);

        let decision = decide(Some(&target), &PropertyValue::from("4"));
        assert_eq!(
            decision,
            NavigationDecision::Navigate {
                target: "3".to_string()
            }
        );
    }
}
