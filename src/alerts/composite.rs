//! AND-combination of sub-conditions.
//!
//! Only conjunction is supported: there is no OR or NOT. Legs are evaluated in
//! order and evaluation stops at the first leg that is not met.

use crate::alerts::error::AlertError;
use crate::alerts::evaluator::{ConditionCheck, EvaluationContext};
use crate::models::alert::{Alert, AlertType};
use tracing::{debug, warn};

pub struct CompositeEvaluator;

impl CompositeEvaluator {
    /// True iff every leg of `alert` holds. An empty composite never fires.
    pub async fn evaluate(
        alert: &Alert,
        check: &dyn ConditionCheck,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        if alert.composite_conditions.is_empty() {
            warn!(alert_id = alert.id, "composite alert {} has no conditions", alert.id);
            return Ok(false);
        }

        for (index, sub) in alert.composite_conditions.iter().enumerate() {
            if sub.alert_type == AlertType::Composite {
                warn!(alert_id = alert.id, index, "composite alert {} nests a composite condition", alert.id);
                return Ok(false);
            }

            let view = sub.view(alert);
            if !check.check(&view, ctx).await? {
                debug!(
                    alert_id = alert.id,
                    index,
                    alert_type = %sub.alert_type,
                    "composite alert {}: condition {} ({}) not met",
                    alert.id,
                    index,
                    sub.alert_type
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}
