use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How the incoming and outgoing views animate when the visible screen changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    None,
    Fade,
    SlideForward,
    SlideBack,
    SlideUp,
    SlideDown,
    DropUp,
    DropDown,
}

impl Transition {
    /// The transition that visually undoes this one
    pub fn reverse(self) -> Self {
        match self {
            Transition::None => Transition::None,
            Transition::Fade => Transition::Fade,
            Transition::SlideForward => Transition::SlideBack,
            Transition::SlideBack => Transition::SlideForward,
            Transition::SlideUp => Transition::SlideDown,
            Transition::SlideDown => Transition::SlideUp,
            Transition::DropUp => Transition::DropDown,
            Transition::DropDown => Transition::DropUp,
        }
    }

    /// Enter/exit animation descriptors for this kind
    pub fn plan(self, durations: &TransitionDurations) -> TransitionPlan {
        use ViewState as V;

        let slide = durations.slide;
        let (enter, exit) = match self {
            Transition::None => (None, None),
            Transition::Fade => (
                Some(AnimationStep::enter(V::transparent(), durations.fade)),
                Some(AnimationStep::exit(V::transparent(), durations.fade)),
            ),
            Transition::SlideForward => (
                Some(AnimationStep::enter(V::shifted(1.0, 0.0), slide)),
                Some(AnimationStep::exit(V::shifted(-1.0, 0.0), slide)),
            ),
            Transition::SlideBack => (
                Some(AnimationStep::enter(V::shifted(-1.0, 0.0), slide)),
                Some(AnimationStep::exit(V::shifted(1.0, 0.0), slide)),
            ),
            Transition::SlideUp => (
                Some(AnimationStep::enter(V::shifted(0.0, 1.0), slide)),
                Some(AnimationStep::exit(V::shifted(0.0, -1.0), slide)),
            ),
            Transition::SlideDown => (
                Some(AnimationStep::enter(V::shifted(0.0, -1.0), slide)),
                Some(AnimationStep::exit(V::shifted(0.0, 1.0), slide)),
            ),
            Transition::DropUp => (
                Some(AnimationStep::enter(V::shifted(0.0, 1.0), durations.drop)),
                Some(AnimationStep::exit(V::shifted(0.0, -1.0), durations.drop)),
            ),
            Transition::DropDown => (
                Some(AnimationStep::enter(V::shifted(0.0, -1.0), durations.drop)),
                Some(AnimationStep::exit(V::shifted(0.0, 1.0), durations.drop)),
            ),
        };

        TransitionPlan { transition: self, enter, exit }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Position and opacity of a view, with offsets in container units (1.0 = full width/height)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub offset_x: f32,
    pub offset_y: f32,
    pub opacity: f32,
}

impl ViewState {
    pub const VISIBLE: ViewState = ViewState {
        offset_x: 0.0,
        offset_y: 0.0,
        opacity: 1.0,
    };

    pub fn shifted(offset_x: f32, offset_y: f32) -> Self {
        Self {
            offset_x,
            offset_y,
            opacity: 1.0,
        }
    }

    pub fn transparent() -> Self {
        Self {
            opacity: 0.0,
            ..Self::VISIBLE
        }
    }
}

/// One animation: the view jumps to `from`, then animates to `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStep {
    pub from: ViewState,
    pub to: ViewState,
    pub duration: Duration,
}

impl AnimationStep {
    fn enter(initial: ViewState, duration: Duration) -> Self {
        Self {
            from: initial,
            to: ViewState::VISIBLE,
            duration,
        }
    }

    fn exit(target: ViewState, duration: Duration) -> Self {
        Self {
            from: ViewState::VISIBLE,
            to: target,
            duration,
        }
    }
}

/// The animations a transition kind runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionPlan {
    pub transition: Transition,
    pub enter: Option<AnimationStep>,
    pub exit: Option<AnimationStep>,
}

impl TransitionPlan {
    /// Duration of the animation that actually plays (enter preferred)
    pub fn visible_duration(&self) -> Option<Duration> {
        self.enter.or(self.exit).map(|step| step.duration)
    }
}

/// Fixed per-kind animation durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDurations {
    #[serde(with = "millis")]
    pub slide: Duration,
    #[serde(with = "millis")]
    pub fade: Duration,
    #[serde(with = "millis")]
    pub drop: Duration,
}

impl Default for TransitionDurations {
    fn default() -> Self {
        Self {
            slide: Duration::from_millis(300),
            fade: Duration::from_millis(300),
            drop: Duration::from_millis(400),
        }
    }
}

impl TransitionDurations {
    /// Zero durations, useful for tests and reduced-motion hosts
    pub fn instant() -> Self {
        Self {
            slide: Duration::ZERO,
            fade: Duration::ZERO,
            drop: Duration::ZERO,
        }
    }
}

pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
