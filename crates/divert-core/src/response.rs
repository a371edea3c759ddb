//! Response plans for a chosen option.
//!
//! A plan is an ordered action checklist, the messages that must go out and
//! the ground resources to stage. It is a pure function of the scenario and
//! the option: the same inputs always produce the same plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DecisionOption, EmergencyScenario, EmergencyType, OptionId, Severity};

/// Who a message goes to, or who owns an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    Crew,
    Atc,
    Operations,
    Medical,
    Maintenance,
    Security,
    Passengers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Immediate,
    High,
    Routine,
}

/// One step of the action checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// 1-based position in the checklist
    pub step: u32,
    pub owner: Recipient,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    pub recipient: Recipient,
    pub priority: MessagePriority,
    pub message: String,
}

/// Ground resources to stage at the landing airport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub ground_medical: bool,
    pub fire_rescue: bool,
    pub maintenance: bool,
    pub security: bool,
    /// Personnel by role
    pub personnel: BTreeMap<String, u32>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        !self.ground_medical
            && !self.fire_rescue
            && !self.maintenance
            && !self.security
            && self.personnel.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub scenario_id: Uuid,
    pub option_id: OptionId,
    pub actions: Vec<PlannedAction>,
    pub communications: Vec<Communication>,
    pub resources: ResourceRequirements,
}

/// Build the response plan for executing `option` in `scenario`.
pub fn generate_response_plan(scenario: &EmergencyScenario, option: &DecisionOption) -> ResponsePlan {
    let mut actions = ActionList::default();
    scenario_actions(scenario, &mut actions);
    option_actions(scenario, option, &mut actions);

    ResponsePlan {
        scenario_id: scenario.id,
        option_id: option.id.clone(),
        actions: actions.into_inner(),
        communications: communications(scenario, option),
        resources: resources(scenario, option),
    }
}

#[derive(Default)]
struct ActionList(Vec<PlannedAction>);

impl ActionList {
    fn push(&mut self, owner: Recipient, description: impl Into<String>) {
        let step = self.0.len() as u32 + 1;
        self.0.push(PlannedAction {
            step,
            owner,
            description: description.into(),
        });
    }

    fn into_inner(self) -> Vec<PlannedAction> {
        self.0
    }
}

fn scenario_actions(scenario: &EmergencyScenario, actions: &mut ActionList) {
    let declare = if scenario.severity >= Severity::High {
        "Declare MAYDAY and squawk 7700"
    } else {
        "Declare PAN-PAN with ATC"
    };

    match scenario.scenario_type {
        EmergencyType::Medical => {
            actions.push(Recipient::Crew, "Locate medical professionals on board and open the medical kit");
            actions.push(Recipient::Operations, "Patch crew to ground medical advisory service");
            actions.push(Recipient::Crew, declare);
        }
        EmergencyType::Technical => {
            actions.push(Recipient::Crew, "Run the non-normal checklist for the affected system");
            actions.push(Recipient::Crew, declare);
            actions.push(Recipient::Maintenance, "Review fault data and advise on continued operation");
        }
        EmergencyType::Fuel => {
            actions.push(Recipient::Crew, "Cross-check fuel quantity against burn and check for leaks");
            actions.push(
                Recipient::Crew,
                if scenario.severity >= Severity::Critical {
                    "Declare MAYDAY FUEL and squawk 7700"
                } else {
                    "Advise ATC of minimum fuel"
                },
            );
        }
        EmergencyType::Weather => {
            actions.push(Recipient::Crew, "Request deviation around affected airspace");
            actions.push(Recipient::Operations, "Provide updated route and terminal weather");
            if scenario.severity >= Severity::High {
                actions.push(Recipient::Crew, declare);
            }
        }
        EmergencyType::Security => {
            actions.push(Recipient::Crew, "Secure the flight deck and apply the security checklist");
            actions.push(Recipient::Crew, "Squawk 7500 if appropriate and notify ATC");
            actions.push(Recipient::Security, "Alert authorities at candidate landing airports");
        }
    }
}

fn option_actions(scenario: &EmergencyScenario, option: &DecisionOption, actions: &mut ActionList) {
    match &option.id {
        OptionId::Divert(code) => {
            actions.push(Recipient::Atc, format!("Request clearance direct to {code}"));
            actions.push(Recipient::Crew, format!("Brief approach and landing at {code}"));
            if option.fuel_required_kg > 0.6 * scenario.fuel_remaining_kg {
                actions.push(Recipient::Crew, "Configure for minimum-fuel arrival and monitor burn");
            }
            actions.push(Recipient::Operations, format!("Coordinate ground handling at {code}"));
            actions.push(Recipient::Operations, "Arrange onward travel for passengers");
        }
        OptionId::Continue => {
            actions.push(Recipient::Operations, "Confirm concurrence to continue to destination");
            actions.push(
                Recipient::Crew,
                format!("Reassess the {} situation every 30 minutes", scenario.scenario_type),
            );
            actions.push(Recipient::Operations, "Pre-position resources at destination");
        }
        OptionId::Hold => {
            actions.push(Recipient::Atc, "Request holding clearance at present position");
            actions.push(
                Recipient::Crew,
                format!("Reassess within {:.0} minutes and set a bingo fuel", option.time_impact_min),
            );
            actions.push(Recipient::Operations, "Prepare diversion options for reassessment");
        }
    }
}

fn communications(scenario: &EmergencyScenario, option: &DecisionOption) -> Vec<Communication> {
    let urgent = if scenario.requires_immediate {
        MessagePriority::Immediate
    } else {
        MessagePriority::High
    };
    let intent = match &option.id {
        OptionId::Divert(code) => format!("diverting to {code}"),
        OptionId::Continue => "continuing to destination".to_string(),
        OptionId::Hold => "requesting hold to assess".to_string(),
    };

    let mut messages = vec![
        Communication {
            recipient: Recipient::Atc,
            priority: urgent,
            message: format!(
                "{} emergency, {} souls on board, {}",
                scenario.scenario_type,
                scenario.passengers + scenario.crew,
                intent
            ),
        },
        Communication {
            recipient: Recipient::Operations,
            priority: MessagePriority::High,
            message: format!("{}: {}", option.title, scenario.description),
        },
    ];

    let lands = !matches!(option.id, OptionId::Hold);
    match scenario.scenario_type {
        EmergencyType::Medical if lands => messages.push(Communication {
            recipient: Recipient::Medical,
            priority: urgent,
            message: format!(
                "Ambulance and medical team to meet the aircraft, ETA {:.0} min",
                option.time_impact_min
            ),
        }),
        EmergencyType::Technical => messages.push(Communication {
            recipient: Recipient::Maintenance,
            priority: MessagePriority::High,
            message: scenario.description.clone(),
        }),
        EmergencyType::Security => messages.push(Communication {
            recipient: Recipient::Security,
            priority: MessagePriority::Immediate,
            message: scenario.description.clone(),
        }),
        _ => {}
    }

    messages.push(Communication {
        recipient: Recipient::Passengers,
        priority: MessagePriority::Routine,
        message: match &option.id {
            OptionId::Divert(_) => "Cabin announcement: unscheduled landing, follow crew instructions".to_string(),
            OptionId::Continue => "Cabin announcement: situation under control, continuing to destination".to_string(),
            OptionId::Hold => "Cabin announcement: short delay while the crew assesses the situation".to_string(),
        },
    });

    messages
}

fn resources(scenario: &EmergencyScenario, option: &DecisionOption) -> ResourceRequirements {
    if matches!(option.id, OptionId::Hold) {
        return ResourceRequirements::default();
    }

    let mut resources = ResourceRequirements::default();
    let mut add = |role: &str, count: u32| {
        *resources.personnel.entry(role.to_string()).or_insert(0) += count;
    };
    add("ground_handling", 4);

    let mut ground_medical = false;
    let mut fire_rescue = false;
    let mut maintenance = false;
    let mut security = false;

    match scenario.scenario_type {
        EmergencyType::Medical => {
            ground_medical = true;
            add("paramedic", if scenario.severity >= Severity::Critical { 4 } else { 2 });
        }
        EmergencyType::Technical => {
            fire_rescue = true;
            maintenance = true;
            add("fire_rescue", 6);
            add("engineer", 2);
        }
        EmergencyType::Fuel => {
            fire_rescue = scenario.severity >= Severity::Critical;
            if fire_rescue {
                add("fire_rescue", 4);
            }
            add("fueler", 1);
        }
        EmergencyType::Security => {
            security = true;
            add("security_officer", 6);
        }
        EmergencyType::Weather => {}
    }

    resources.ground_medical = ground_medical;
    resources.fire_rescue = fire_rescue;
    resources.maintenance = maintenance;
    resources.security = security;
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsequenceProfile, ImpactLevel, Position, RiskLevel};
    use chrono::Utc;

    fn scenario(scenario_type: EmergencyType, severity: Severity) -> EmergencyScenario {
        EmergencyScenario {
            id: Uuid::new_v4(),
            scenario_type,
            severity,
            position: Position::new(52.0, -25.0, 35_000.0),
            fuel_remaining_kg: 40_000.0,
            passengers: 250,
            crew: 12,
            timestamp: Utc::now(),
            requires_immediate: severity >= Severity::High,
            diversion_required: severity >= Severity::High,
            declared: false,
            description: "test scenario".into(),
        }
    }

    fn option(id: OptionId) -> DecisionOption {
        DecisionOption {
            title: format!("{id}"),
            id,
            risk_level: RiskLevel::Low,
            cost_impact: 20_000.0,
            time_impact_min: 45.0,
            safety_score: 90.0,
            feasibility: 100.0,
            composite_score: 85.0,
            distance_nm: 240.0,
            fuel_required_kg: 8_000.0,
            consequences: ConsequenceProfile {
                fuel: ImpactLevel::Minimal,
                passengers: ImpactLevel::Moderate,
                crew: ImpactLevel::Minimal,
                operational: ImpactLevel::Significant,
            },
            requirements: Vec::new(),
        }
    }

    #[test]
    fn medical_diversion_stages_medical_team() {
        let scenario = scenario(EmergencyType::Medical, Severity::Critical);
        let plan = generate_response_plan(&scenario, &option(OptionId::Divert("CYQX".into())));

        assert_eq!(plan.scenario_id, scenario.id);
        assert!(plan.resources.ground_medical);
        assert_eq!(plan.resources.personnel.get("paramedic"), Some(&4));
        assert!(plan
            .communications
            .iter()
            .any(|c| c.recipient == Recipient::Medical && c.priority == MessagePriority::Immediate));
        assert!(plan.actions.iter().any(|a| a.description.contains("CYQX")));
        let steps: Vec<u32> = plan.actions.iter().map(|a| a.step).collect();
        assert_eq!(steps, (1..=plan.actions.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn hold_needs_no_ground_resources() {
        let scenario = scenario(EmergencyType::Technical, Severity::High);
        let plan = generate_response_plan(&scenario, &option(OptionId::Hold));
        assert!(plan.resources.is_empty());
        assert_eq!(plan.communications[0].recipient, Recipient::Atc);
        assert!(plan.communications.iter().any(|c| c.recipient == Recipient::Maintenance));
    }

    #[test]
    fn security_alerts_security_services() {
        let scenario = scenario(EmergencyType::Security, Severity::Critical);
        let plan = generate_response_plan(&scenario, &option(OptionId::Continue));
        assert!(plan.resources.security);
        assert!(plan
            .communications
            .iter()
            .any(|c| c.recipient == Recipient::Security));
        assert!(plan.communications[0].message.contains("262 souls"));
    }

    #[test]
    fn plans_are_deterministic() {
        let scenario = scenario(EmergencyType::Fuel, Severity::Critical);
        let option = option(OptionId::Divert("BIKF".into()));
        assert_eq!(
            generate_response_plan(&scenario, &option),
            generate_response_plan(&scenario, &option)
        );
    }
}
