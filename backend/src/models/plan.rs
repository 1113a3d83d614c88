use once_cell::sync::Lazy;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::utils::currency::minor_to_major;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanKey {
    Basic,
    Pro,
    Enterprise,
}

impl PlanKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKey::Basic => "BASIC",
            PlanKey::Pro => "PRO",
            PlanKey::Enterprise => "ENTERPRISE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    #[serde(skip)]
    pub key: PlanKey,
    pub id: &'static str,
    pub name: &'static str,
    /// Minor currency units (paise).
    pub amount: i64,
    pub currency: &'static str,
    pub interval: u32,
    pub interval_type: IntervalType,
    pub features: &'static [&'static str],
}

impl Plan {
    pub fn amount_major(&self) -> f64 {
        minor_to_major(self.amount)
    }
}

/// Purchasable tiers. Built once, never mutated.
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    fn builtin() -> Self {
        Self {
            plans: vec![
                Plan {
                    key: PlanKey::Basic,
                    id: "plan_basic_monthly",
                    name: "Basic",
                    amount: 99_900,
                    currency: "INR",
                    interval: 1,
                    interval_type: IntervalType::Month,
                    features: &["5 Clients", "10 Projects", "5GB Storage", "Email Support"],
                },
                Plan {
                    key: PlanKey::Pro,
                    id: "plan_pro_monthly",
                    name: "Pro",
                    amount: 199_900,
                    currency: "INR",
                    interval: 1,
                    interval_type: IntervalType::Month,
                    features: &[
                        "25 Clients",
                        "50 Projects",
                        "50GB Storage",
                        "Priority Support",
                        "Custom Branding",
                    ],
                },
                Plan {
                    key: PlanKey::Enterprise,
                    id: "plan_enterprise_monthly",
                    name: "Enterprise",
                    amount: 499_900,
                    currency: "INR",
                    interval: 1,
                    interval_type: IntervalType::Month,
                    features: &[
                        "Unlimited Clients",
                        "Unlimited Projects",
                        "500GB Storage",
                        "24/7 Support",
                        "White Label",
                        "API Access",
                    ],
                },
            ],
        }
    }

    pub fn find_by_id(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }
}

impl Serialize for PlanCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.plans.len()))?;
        for plan in &self.plans {
            map.serialize_entry(plan.key.as_str(), plan)?;
        }
        map.end()
    }
}

pub static PLAN_CATALOG: Lazy<PlanCatalog> = Lazy::new(PlanCatalog::builtin);

pub fn catalog() -> &'static PlanCatalog {
    &PLAN_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plans_by_exact_id() {
        let pro = catalog().find_by_id("plan_pro_monthly").expect("pro plan");
        assert_eq!(pro.name, "Pro");
        assert_eq!(pro.amount, 199_900);
        assert_eq!(pro.amount_major(), 1999.0);
        assert!(catalog().find_by_id("PLAN_PRO_MONTHLY").is_none());
        assert!(catalog().find_by_id("").is_none());
    }

    #[test]
    fn serializes_as_keyed_object_in_catalog_order() {
        let json = serde_json::to_value(catalog()).unwrap();
        let obj = json.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(json["PRO"]["id"], "plan_pro_monthly");
        assert_eq!(json["PRO"]["interval_type"], "month");
        assert_eq!(json["ENTERPRISE"]["features"].as_array().unwrap().len(), 6);
        assert!(json["BASIC"].get("key").is_none());
    }
}
