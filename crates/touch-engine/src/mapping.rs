//! Resolution of pressed keys into widget triggers.
//!
//! The manager tracks which keys are down and which subscribed combinations
//! are active. On every press it walks the subscribed combinations that are
//! fully held, longest first, so `Ctrl_L+A` wins over `A`. A combination that
//! is a strict subset of an active one stays dormant until the longer one is
//! released.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use touch_keys::{Key, KeyCombination};

use crate::WidgetId;

/// Extra predicate a subscription must satisfy to fire.
pub type Condition = Rc<dyn Fn() -> bool>;

/// Callbacks into the widgets behind subscriptions.
pub trait MappingDispatch {
    /// Activate `widget` for `combination`. Returns whether it acted.
    fn trigger(&mut self, widget: WidgetId, combination: &KeyCombination) -> bool;
    /// Deactivate `widget` for `combination`. Returns whether it acted.
    fn release(&mut self, widget: WidgetId, combination: &KeyCombination) -> bool;
}

#[derive(Clone)]
pub struct KeySubscription {
    pub widget: WidgetId,
    pub combination: KeyCombination,
    /// Fire again on every matching press while already active.
    pub reentrant: bool,
    pub condition: Option<Condition>,
    /// Named widget states that must all be set.
    pub required_states: Vec<String>,
}

impl KeySubscription {
    #[must_use]
    pub fn new(widget: WidgetId, combination: KeyCombination, reentrant: bool) -> Self {
        Self {
            widget,
            combination,
            reentrant,
            condition: None,
            required_states: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Fn() -> bool + 'static) -> Self {
        self.condition = Some(Rc::new(condition));
        self
    }

    #[must_use]
    pub fn with_required_states(mut self, states: impl IntoIterator<Item = String>) -> Self {
        self.required_states = states.into_iter().collect();
        self
    }
}

impl fmt::Debug for KeySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySubscription")
            .field("widget", &self.widget)
            .field("combination", &self.combination.to_string())
            .field("reentrant", &self.reentrant)
            .field("condition", &self.condition.is_some())
            .field("required_states", &self.required_states)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct KeyMappingManager {
    subscriptions: HashMap<KeyCombination, Vec<KeySubscription>>,
    pressed: HashSet<Key>,
    triggered: HashMap<KeyCombination, HashSet<Key>>,
    widget_states: HashMap<WidgetId, HashMap<String, bool>>,
}

impl KeyMappingManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription. Empty combinations are rejected.
    pub fn subscribe(&mut self, subscription: KeySubscription) -> bool {
        if subscription.combination.is_empty() {
            return false;
        }
        tracing::debug!(
            combination = %subscription.combination,
            widget = %subscription.widget,
            reentrant = subscription.reentrant,
            "Key mapping registered"
        );
        self.subscriptions
            .entry(subscription.combination.clone())
            .or_default()
            .push(subscription);
        true
    }

    /// Drop every subscription of `widget`. Returns whether any existed.
    pub fn unsubscribe(&mut self, widget: WidgetId) -> bool {
        let mut removed = false;
        for subs in self.subscriptions.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.widget != widget);
            removed |= subs.len() != before;
        }
        self.prune();
        self.widget_states.remove(&widget);
        removed
    }

    /// Drop the subscription of `widget` to one combination.
    pub fn unsubscribe_key(&mut self, widget: WidgetId, combination: &KeyCombination) -> bool {
        let Some(subs) = self.subscriptions.get_mut(combination) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.widget != widget);
        let removed = subs.len() != before;
        self.prune();
        removed
    }

    fn prune(&mut self) {
        self.subscriptions.retain(|_, subs| !subs.is_empty());
        let subscriptions = &self.subscriptions;
        self.triggered.retain(|combo, _| subscriptions.contains_key(combo));
    }

    /// Combinations `widget` is subscribed to, in canonical order.
    #[must_use]
    pub fn subscriptions_of(&self, widget: WidgetId) -> Vec<KeyCombination> {
        let mut combos: Vec<KeyCombination> = self
            .subscriptions
            .iter()
            .filter(|(_, subs)| subs.iter().any(|s| s.widget == widget))
            .map(|(combo, _)| combo.clone())
            .collect();
        combos.sort();
        combos
    }

    pub fn set_widget_state(&mut self, widget: WidgetId, name: &str, value: bool) {
        self.widget_states
            .entry(widget)
            .or_default()
            .insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn is_pressed(&self, key: &Key) -> bool {
        self.pressed.contains(key)
    }

    #[must_use]
    pub fn pressed_keys(&self) -> &HashSet<Key> {
        &self.pressed
    }

    #[must_use]
    pub fn is_triggered(&self, combination: &KeyCombination) -> bool {
        self.triggered.contains_key(combination)
    }

    /// Active combinations, longest first.
    #[must_use]
    pub fn triggered(&self) -> Vec<KeyCombination> {
        let mut combos: Vec<KeyCombination> = self.triggered.keys().cloned().collect();
        combos.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        combos
    }

    /// Handle a key press. Returns whether the press was consumed.
    pub fn handle_press(&mut self, key: Key, dispatch: &mut dyn MappingDispatch) -> bool {
        self.pressed.insert(key.clone());

        if self.trigger_matching(dispatch) {
            return true;
        }

        // Keys feeding an active non-reentrant mapping stay swallowed.
        self.triggered.iter().any(|(combo, cause)| {
            cause.contains(&key)
                && self
                    .subscriptions
                    .get(combo)
                    .is_some_and(|subs| subs.iter().any(|s| !s.reentrant))
        })
    }

    /// Handle a key release. Returns whether a mapping was released or a
    /// shorter one fired as a result.
    pub fn handle_release(&mut self, key: &Key, dispatch: &mut dyn MappingDispatch) -> bool {
        if !self.pressed.contains(key) {
            return false;
        }

        let mut affected: Vec<KeyCombination> = self
            .triggered
            .iter()
            .filter(|(_, cause)| cause.contains(key))
            .map(|(combo, _)| combo.clone())
            .collect();
        affected.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut released_any = false;
        for combo in affected {
            released_any |= self.release_combination(&combo, dispatch);
            tracing::debug!(combination = %combo, key = %key, "Mapping released");
        }

        self.pressed.remove(key);
        let triggered_new = self.trigger_matching(dispatch);
        released_any || triggered_new
    }

    /// Release every active mapping and forget all pressed keys.
    pub fn release_all(&mut self, dispatch: &mut dyn MappingDispatch) -> bool {
        let mut released_any = false;
        for combo in self.triggered() {
            released_any |= self.release_combination(&combo, dispatch);
        }
        self.pressed.clear();
        released_any
    }

    fn release_combination(
        &mut self,
        combo: &KeyCombination,
        dispatch: &mut dyn MappingDispatch,
    ) -> bool {
        self.triggered.remove(combo);
        let subs = self.subscriptions.get(combo).cloned().unwrap_or_default();
        let mut released = false;
        for sub in subs {
            released |= dispatch.release(sub.widget, combo);
        }
        released
    }

    fn conditions_met(&self, sub: &KeySubscription) -> bool {
        if let Some(condition) = &sub.condition {
            if !condition() {
                return false;
            }
        }
        let states = self.widget_states.get(&sub.widget);
        sub.required_states.iter().all(|name| {
            states
                .and_then(|s| s.get(name))
                .copied()
                .unwrap_or(false)
        })
    }

    fn trigger_matching(&mut self, dispatch: &mut dyn MappingDispatch) -> bool {
        let mut candidates: Vec<KeyCombination> = self
            .subscriptions
            .keys()
            .filter(|combo| combo.keys().iter().all(|k| self.pressed.contains(k)))
            .cloned()
            .collect();
        candidates.sort_by_key(|combo| (Reverse(combo.len()), combo.clone()));

        let mut triggered_any = false;
        for combo in candidates {
            let shadowed = self
                .triggered
                .keys()
                .any(|active| combo.is_strict_subset_of(active));
            if shadowed {
                continue;
            }

            let already = self.triggered.contains_key(&combo);
            let subs = self.subscriptions.get(&combo).cloned().unwrap_or_default();
            if already && !subs.iter().any(|s| s.reentrant) {
                continue;
            }
            if !already {
                self.triggered
                    .insert(combo.clone(), combo.keys().iter().cloned().collect());
            }

            let mut fired = false;
            for sub in &subs {
                if already && !sub.reentrant {
                    continue;
                }
                if !self.conditions_met(sub) {
                    continue;
                }
                fired |= dispatch.trigger(sub.widget, &combo);
            }

            if fired {
                triggered_any = true;
                tracing::debug!(combination = %combo, reentry = already, "Mapping triggered");
            } else if !already {
                self.triggered.remove(&combo);
            }
        }
        triggered_any
    }

    /// Dump subscriptions and live state at debug level.
    pub fn log_state(&self) {
        tracing::debug!(combinations = self.subscriptions.len(), "Key mapping state");
        let mut combos: Vec<&KeyCombination> = self.subscriptions.keys().collect();
        combos.sort();
        for combo in combos {
            for sub in &self.subscriptions[combo] {
                tracing::debug!(combination = %combo, ?sub, "  subscription");
            }
        }
        let pressed: Vec<&str> = self.pressed.iter().map(Key::name).collect();
        let triggered: Vec<String> = self.triggered().iter().map(ToString::to_string).collect();
        tracing::debug!(?pressed, ?triggered, "  live");
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.pressed.clear();
        self.triggered.clear();
        self.widget_states.clear();
        tracing::info!("Key mapping manager cleared");
    }
}
