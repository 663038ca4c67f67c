//! Contact events and the observers that receive them.
//!
//! The physics adapter reports touches as [`ShapePairEvent`]s tagged with
//! `(body id, shape index)`. This module resolves those tags against the live
//! bodies into [`ContactSide`]s and fans them out to registered observers.
//! Pre-solve runs inside the physics step through [`PreSolveHooks`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rapier2d::prelude::{ColliderHandle, PairFilterContext, PhysicsHooks, SolverFlags};

use crate::api::types::BodyId;
use crate::components::body::BodyMap;
use crate::core::physics::{PairEventKind, ShapePairEvent, ShapeTag};

/// One participant of a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSide {
    pub body_id: BodyId,
    pub shape_key: String,
    /// Map object the shape was created from, if any.
    pub tile_map_object_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub side_a: ContactSide,
    pub side_b: ContactSide,
}

/// A contact about to be resolved by the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreSolveContact {
    pub side_a: ContactSide,
    pub side_b: ContactSide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorContact {
    pub sensor: ContactSide,
    pub visitor: ContactSide,
}

/// Receives contact notifications from a scene.
///
/// Callbacks run synchronously while the scene is rendering, so they cannot
/// reach back into the scene. Pre-solve runs inside the physics step; return
/// `false` to veto the contact.
pub trait ContactObserver: Send + Sync {
    fn begin_contact(&self, _contact: &Contact) {}

    fn end_contact(&self, _contact: &Contact) {}

    fn begin_sensor_contact(&self, _contact: &SensorContact) {}

    fn end_sensor_contact(&self, _contact: &SensorContact) {}

    fn pre_solve_contact(&self, _contact: &PreSolveContact) -> bool {
        true
    }
}

/// Look up the scene-level owner of a tagged collider.
pub fn resolve_side(bodies: &BodyMap, tag: ShapeTag) -> Option<ContactSide> {
    let body = bodies.get(&tag.body)?;
    let shape = body.shape(tag.shape)?;
    Some(ContactSide {
        body_id: body.id(),
        shape_key: shape.key().to_owned(),
        tile_map_object_id: shape.tile_map_object_id(),
    })
}

// ---------------------------------------------------------------------------
// ObserverRegistry
// ---------------------------------------------------------------------------

/// Non-owning list of observers in registration order.
/// Observers dropped by their owner are pruned on the next snapshot.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Weak<dyn ContactObserver>>,
}

fn same_observer(weak: &Weak<dyn ContactObserver>, observer: &Arc<dyn ContactObserver>) -> bool {
    std::ptr::eq(weak.as_ptr() as *const (), Arc::as_ptr(observer) as *const ())
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the observer is already registered.
    pub fn add(&mut self, observer: &Arc<dyn ContactObserver>) -> bool {
        if self.observers.iter().any(|weak| same_observer(weak, observer)) {
            return false;
        }
        self.observers.push(Arc::downgrade(observer));
        true
    }

    pub fn remove(&mut self, observer: &Arc<dyn ContactObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|weak| !same_observer(weak, observer));
        self.observers.len() != before
    }

    /// Live observers, in registration order.
    pub fn snapshot(&mut self) -> Vec<Arc<dyn ContactObserver>> {
        self.observers.retain(|weak| weak.strong_count() > 0);
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.observers.iter().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Deliver drained physics events to observers. Events whose tags no longer
/// resolve to a live body shape are dropped.
pub fn dispatch_events(observers: &[Arc<dyn ContactObserver>], bodies: &BodyMap, events: &[ShapePairEvent]) {
    if observers.is_empty() {
        return;
    }
    for event in events {
        let (Some(a), Some(b)) = (resolve_side(bodies, event.a), resolve_side(bodies, event.b)) else {
            log::trace!("Dropping contact event with unknown shape: {:?}", event);
            continue;
        };
        match event.kind {
            PairEventKind::Contact => {
                let contact = Contact { side_a: a, side_b: b };
                log::trace!(
                    "{} contact: {:?}/{} - {:?}/{}",
                    if event.started { "Begin" } else { "End" },
                    contact.side_a.body_id,
                    contact.side_a.shape_key,
                    contact.side_b.body_id,
                    contact.side_b.shape_key
                );
                for observer in observers {
                    if event.started {
                        observer.begin_contact(&contact);
                    } else {
                        observer.end_contact(&contact);
                    }
                }
            }
            PairEventKind::Sensor => {
                let contact = SensorContact { sensor: a, visitor: b };
                log::trace!(
                    "{} sensor contact: {:?}/{} <- {:?}/{}",
                    if event.started { "Begin" } else { "End" },
                    contact.sensor.body_id,
                    contact.sensor.shape_key,
                    contact.visitor.body_id,
                    contact.visitor.shape_key
                );
                for observer in observers {
                    if event.started {
                        observer.begin_sensor_contact(&contact);
                    } else {
                        observer.end_sensor_contact(&contact);
                    }
                }
            }
        }
    }
}

/// Physics hooks asking observers whether a contact may proceed.
/// Any observer returning false vetoes the contact; later observers are not asked.
pub struct PreSolveHooks<'a> {
    pub observers: &'a [Arc<dyn ContactObserver>],
    pub bodies: &'a BodyMap,
}

impl PreSolveHooks<'_> {
    fn allows(&self, a: ShapeTag, b: ShapeTag) -> bool {
        let (Some(side_a), Some(side_b)) = (resolve_side(self.bodies, a), resolve_side(self.bodies, b)) else {
            return true;
        };
        let contact = PreSolveContact { side_a, side_b };
        self.observers
            .iter()
            .all(|observer| observer.pre_solve_contact(&contact))
    }
}

impl PhysicsHooks for PreSolveHooks<'_> {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let tag = |handle: ColliderHandle| context.colliders.get(handle).map(|c| ShapeTag::decode(c.user_data));
        if let (Some(a), Some(b)) = (tag(context.collider1), tag(context.collider2)) {
            if !self.allows(a, b) {
                return None;
            }
        }
        Some(SolverFlags::COMPUTE_IMPULSES)
    }
}

// ---------------------------------------------------------------------------
// ContactCallbacks
// ---------------------------------------------------------------------------

/// Subscription handle returned by [`ContactCallbacks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u32);

type ContactFn = Arc<dyn Fn(&Contact) + Send + Sync>;
type SensorFn = Arc<dyn Fn(&SensorContact) + Send + Sync>;

#[derive(Default)]
struct CallbackSets {
    next_id: u32,
    begin_contact: BTreeMap<SubscriptionId, ContactFn>,
    end_contact: BTreeMap<SubscriptionId, ContactFn>,
    begin_sensor: BTreeMap<SubscriptionId, SensorFn>,
    end_sensor: BTreeMap<SubscriptionId, SensorFn>,
}

impl CallbackSets {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

/// Ready-made observer holding closures per event kind.
///
/// Callbacks are invoked in subscription order. A callback may subscribe or
/// unsubscribe; the change takes effect from the next event.
#[derive(Default)]
pub struct ContactCallbacks {
    sets: Mutex<CallbackSets>,
}

impl ContactCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> std::sync::MutexGuard<'_, CallbackSets> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe_begin_contact(&self, f: impl Fn(&Contact) + Send + Sync + 'static) -> SubscriptionId {
        let mut sets = self.sets();
        let id = sets.allocate();
        sets.begin_contact.insert(id, Arc::new(f));
        id
    }

    pub fn unsubscribe_begin_contact(&self, id: SubscriptionId) -> bool {
        self.sets().begin_contact.remove(&id).is_some()
    }

    pub fn subscribe_end_contact(&self, f: impl Fn(&Contact) + Send + Sync + 'static) -> SubscriptionId {
        let mut sets = self.sets();
        let id = sets.allocate();
        sets.end_contact.insert(id, Arc::new(f));
        id
    }

    pub fn unsubscribe_end_contact(&self, id: SubscriptionId) -> bool {
        self.sets().end_contact.remove(&id).is_some()
    }

    pub fn subscribe_begin_sensor_contact(
        &self,
        f: impl Fn(&SensorContact) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut sets = self.sets();
        let id = sets.allocate();
        sets.begin_sensor.insert(id, Arc::new(f));
        id
    }

    pub fn unsubscribe_begin_sensor_contact(&self, id: SubscriptionId) -> bool {
        self.sets().begin_sensor.remove(&id).is_some()
    }

    pub fn subscribe_end_sensor_contact(
        &self,
        f: impl Fn(&SensorContact) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut sets = self.sets();
        let id = sets.allocate();
        sets.end_sensor.insert(id, Arc::new(f));
        id
    }

    pub fn unsubscribe_end_sensor_contact(&self, id: SubscriptionId) -> bool {
        self.sets().end_sensor.remove(&id).is_some()
    }

    /// Total number of live subscriptions across all event kinds.
    pub fn subscription_count(&self) -> usize {
        let sets = self.sets();
        sets.begin_contact.len() + sets.end_contact.len() + sets.begin_sensor.len() + sets.end_sensor.len()
    }
}

impl ContactObserver for ContactCallbacks {
    fn begin_contact(&self, contact: &Contact) {
        let callbacks: Vec<ContactFn> = self.sets().begin_contact.values().cloned().collect();
        for callback in callbacks {
            callback(contact);
        }
    }

    fn end_contact(&self, contact: &Contact) {
        let callbacks: Vec<ContactFn> = self.sets().end_contact.values().cloned().collect();
        for callback in callbacks {
            callback(contact);
        }
    }

    fn begin_sensor_contact(&self, contact: &SensorContact) {
        let callbacks: Vec<SensorFn> = self.sets().begin_sensor.values().cloned().collect();
        for callback in callbacks {
            callback(contact);
        }
    }

    fn end_sensor_contact(&self, contact: &SensorContact) {
        let callbacks: Vec<SensorFn> = self.sets().end_sensor.values().cloned().collect();
        for callback in callbacks {
            callback(contact);
        }
    }
}
