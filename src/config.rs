use crate::calc::aggregate::ScoreWeights;
use crate::calc::competency::CompetencyThresholds;
use crate::calc::record::DEFAULT_COMPREHENSIVE_MAX;
use crate::db;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Env var holding the `tracing` filter directive (e.g. `debug`,
/// `assessd=trace`).
pub const LOG_FILTER_ENV: &str = "ASSESSD_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const CALC_CONFIG_KEY: &str = "calc.config";

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub weights: ScoreWeights,
    pub thresholds: CompetencyThresholds,
    pub default_comprehensive_max: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: CompetencyThresholds::default(),
            default_comprehensive_max: DEFAULT_COMPREHENSIVE_MAX,
        }
    }
}

fn patch_number(v: &Value, field: &str) -> Result<f64, String> {
    v.as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("{} must be a number", field))
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        let w = &self.weights;
        for (name, v) in [("weights.fa", w.fa), ("weights.ia", w.ia), ("weights.ca", w.ca)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(format!("{} must be >= 0", name));
            }
        }
        if ((w.fa + w.ia + w.ca) - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err("weights must sum to 1.0".to_string());
        }

        let t = &self.thresholds;
        for (name, v) in [
            ("thresholds.coreSpecific", t.core_specific),
            ("thresholds.coreGeneral", t.core_general),
            ("thresholds.complementary", t.complementary),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(format!("{} must be between 0 and 100", name));
            }
        }

        if !(self.default_comprehensive_max.is_finite() && self.default_comprehensive_max > 0.0) {
            return Err("defaultComprehensiveMax must be > 0".to_string());
        }
        Ok(())
    }

    /// Apply a partial update. Unknown keys are rejected; the result must
    /// still validate as a whole.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = *self;
        for (k, v) in patch {
            match k.as_str() {
                "weights" => {
                    let Some(obj) = v.as_object() else {
                        return Err("weights must be an object".to_string());
                    };
                    for (wk, wv) in obj {
                        let field = format!("weights.{}", wk);
                        match wk.as_str() {
                            "fa" => next.weights.fa = patch_number(wv, &field)?,
                            "ia" => next.weights.ia = patch_number(wv, &field)?,
                            "ca" => next.weights.ca = patch_number(wv, &field)?,
                            _ => return Err(format!("unknown field: {}", field)),
                        }
                    }
                }
                "thresholds" => {
                    let Some(obj) = v.as_object() else {
                        return Err("thresholds must be an object".to_string());
                    };
                    for (tk, tv) in obj {
                        let field = format!("thresholds.{}", tk);
                        match tk.as_str() {
                            "coreSpecific" => {
                                next.thresholds.core_specific = patch_number(tv, &field)?
                            }
                            "coreGeneral" => {
                                next.thresholds.core_general = patch_number(tv, &field)?
                            }
                            "complementary" => {
                                next.thresholds.complementary = patch_number(tv, &field)?
                            }
                            _ => return Err(format!("unknown field: {}", field)),
                        }
                    }
                }
                "defaultComprehensiveMax" => {
                    next.default_comprehensive_max = patch_number(v, k)?;
                }
                _ => return Err(format!("unknown field: {}", k)),
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Defaults overlaid with the saved override. A damaged override is logged
/// and ignored so reports keep working.
pub fn load(conn: &Connection) -> anyhow::Result<EngineConfig> {
    let mut current = EngineConfig::default();
    if let Some(saved) = db::settings_get_json(conn, CALC_CONFIG_KEY)? {
        match saved.as_object() {
            Some(obj) => {
                if let Err(msg) = current.apply_patch(obj) {
                    tracing::warn!(error = %msg, "ignoring invalid saved calc config");
                }
            }
            None => tracing::warn!("saved calc config is not an object; using defaults"),
        }
    }
    Ok(current)
}

pub fn save(conn: &Connection, config: &EngineConfig) -> anyhow::Result<()> {
    db::settings_set_json(conn, CALC_CONFIG_KEY, &serde_json::to_value(config)?)
}

pub fn reset(conn: &Connection) -> anyhow::Result<()> {
    db::settings_delete(conn, CALC_CONFIG_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_patch_keeps_other_fields() {
        let mut cfg = EngineConfig::default();
        cfg.apply_patch(&obj(json!({ "thresholds": { "coreGeneral": 65 } })))
            .expect("patch");
        assert_eq!(cfg.thresholds.core_general, 65.0);
        assert_eq!(cfg.thresholds.core_specific, 70.0);
        assert_eq!(cfg.weights, ScoreWeights::default());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut cfg = EngineConfig::default();
        let e = cfg
            .apply_patch(&obj(json!({ "weights": { "fa": 0.5 } })))
            .expect_err("must reject");
        assert!(e.contains("sum"));
        assert_eq!(cfg, EngineConfig::default());

        cfg.apply_patch(&obj(json!({ "weights": { "fa": 0.2, "ia": 0.5, "ca": 0.3 } })))
            .expect("balanced weights");
        assert_eq!(cfg.weights.ia, 0.5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.apply_patch(&obj(json!({ "rounding": 1 }))).is_err());
        assert!(cfg
            .apply_patch(&obj(json!({ "thresholds": { "elective": 40 } })))
            .is_err());
        assert!(cfg
            .apply_patch(&obj(json!({ "defaultComprehensiveMax": 0 })))
            .is_err());
    }

    #[test]
    fn serialized_form_is_a_valid_patch() {
        let cfg = EngineConfig::default();
        let value = serde_json::to_value(cfg).expect("serialize");
        let mut round = EngineConfig::default();
        round.apply_patch(&obj(value)).expect("apply serialized");
        assert_eq!(round, cfg);
    }
}
