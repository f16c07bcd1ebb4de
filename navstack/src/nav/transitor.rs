use std::sync::Arc;

use crate::nav::{AnimationHandle, Animator, ScreenRef, Transition, TransitionDurations, TransitionPlan};

/// Runs the enter/exit animation pair of a transition
pub struct Transitor {
    animator: Arc<dyn Animator>,
    durations: TransitionDurations,
}

impl Transitor {
    pub fn new(animator: Arc<dyn Animator>, durations: TransitionDurations) -> Self {
        Self { animator, durations }
    }

    /// Animate `to` in and `from` out, resolving once both animations complete.
    ///
    /// The exit animation is started only after the enter animation reports
    /// it is playing natively. A missing view or a kind without that half
    /// counts as already complete. `on_started` fires once, with the plan,
    /// when `from` and `to` are both pages and at least one animation plays.
    pub async fn run<F>(
        &self,
        transition: Transition,
        from: Option<&ScreenRef>,
        to: Option<&ScreenRef>,
        on_started: F,
    ) -> TransitionPlan
    where
        F: FnOnce(&TransitionPlan),
    {
        let plan = transition.plan(&self.durations);

        let mut enter = match (plan.enter, to) {
            (Some(step), Some(view)) => Some(self.animator.animate(view, step)),
            _ => None,
        };

        if let Some(handle) = enter.as_mut() {
            handle.started().await;
        }

        let exit = match (plan.exit, from) {
            (Some(step), Some(view)) => Some(self.animator.animate(view, step)),
            _ => None,
        };

        let both_pages = matches!((from, to), (Some(from), Some(to)) if !from.is_popup() && !to.is_popup());
        if both_pages && (enter.is_some() || exit.is_some()) {
            let playing = TransitionPlan {
                transition,
                enter: enter.as_ref().and(plan.enter),
                exit: exit.as_ref().and(plan.exit),
            };
            on_started(&playing);
        }

        let enter = enter.unwrap_or_else(AnimationHandle::finished);
        let exit = exit.unwrap_or_else(AnimationHandle::finished);
        futures::join!(enter.completed(), exit.completed());

        log::debug!("Transition {} complete", transition);
        plan
    }
}
