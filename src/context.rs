//! The `Context` is the core of a simulation run. It owns simulated time, the queue of timed
//! plans, a queue of callbacks to run "now", typed data plugins and typed event subscriptions.
//!
//! All scheduling is cooperative and single threaded: `execute` pops one callback at a time, so
//! a given person's phase is only ever touched by one in-flight transition.
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::error::ContagionError;
use crate::hashing::HashMap;
use crate::plan::Queue;

/// A trait for objects that can provide data containers to be held by `Context`
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in `Context`. The plugin type is private to the defining
/// module unless a visibility is given.
#[macro_export]
macro_rules! define_data_plugin {
    ($vis:vis $plugin:ident, $data_container:ty, $default: expr) => {
        $vis struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Marker trait for values that can be passed to `Context::emit_event`.
pub trait SimEvent: Copy + 'static {}

/// Plans scheduled for the same time are run in phase order, then in the order they were added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionPhase {
    First,
    Normal,
    Last,
}

type Callback = dyn FnOnce(&mut Context);
type EventHandler<E> = dyn Fn(&mut Context, E);

pub struct Context {
    plan_queue: Queue<Box<Callback>, ExecutionPhase>,
    callback_queue: VecDeque<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    event_handlers: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            callback_queue: VecDeque::new(),
            data_plugins: HashMap::default(),
            event_handlers: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Schedules `callback` to run at `time` in `ExecutionPhase::Normal`.
    ///
    /// # Errors
    /// Returns `ContagionError::InvalidPlanTime` if `time` is NaN, infinite or in the past.
    pub fn try_add_plan(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
    ) -> Result<(), ContagionError> {
        self.try_add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// Schedules `callback` to run at `time` in the given phase.
    ///
    /// # Errors
    /// Returns `ContagionError::InvalidPlanTime` if `time` is NaN, infinite or in the past.
    pub fn try_add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) -> Result<(), ContagionError> {
        if time.is_nan() || time.is_infinite() || time < self.current_time {
            return Err(ContagionError::InvalidPlanTime {
                time,
                current_time: self.current_time,
            });
        }
        self.plan_queue.add_plan(time, Box::new(callback), phase);
        Ok(())
    }

    /// # Panics
    /// Panics if `time` is NaN, infinite or in the past.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal);
    }

    /// # Panics
    /// Panics if `time` is NaN, infinite or in the past.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        if let Err(e) = self.try_add_plan_with_phase(time, callback, phase) {
            panic!("{e}");
        }
    }

    /// Runs `callback` now and then every `period` for as long as other plans remain.
    ///
    /// # Errors
    /// Returns `ContagionError::InvalidPlanTime` if `period` is not a positive, finite number.
    pub fn add_periodic_plan_with_phase(
        &mut self,
        period: f64,
        callback: impl Fn(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) -> Result<(), ContagionError> {
        if period.is_nan() || period.is_infinite() || period <= 0.0 {
            return Err(ContagionError::InvalidPlanTime {
                time: period,
                current_time: self.current_time,
            });
        }
        let callback: Rc<dyn Fn(&mut Context)> = Rc::new(callback);
        let now = self.current_time;
        self.try_add_plan_with_phase(
            now,
            move |context| context.evaluate_periodic_and_schedule_next(period, callback, phase),
            phase,
        )
    }

    fn evaluate_periodic_and_schedule_next(
        &mut self,
        period: f64,
        callback: Rc<dyn Fn(&mut Context)>,
        phase: ExecutionPhase,
    ) {
        callback(self);
        // Stop once nothing else is scheduled; otherwise the run would never end.
        if !self.plan_queue.is_empty() {
            let next_time = self.current_time + period;
            self.add_plan_with_phase(
                next_time,
                move |context| context.evaluate_periodic_and_schedule_next(period, callback, phase),
                phase,
            );
        }
    }

    /// Queues `callback` to run at the current time, before any timed plan.
    pub fn queue_callback(&mut self, callback: impl FnOnce(&mut Context) + 'static) {
        self.callback_queue.push_back(Box::new(callback));
    }

    /// Registers `handler` to be called for every subsequently emitted event of type `E`.
    pub fn subscribe_to_event<E: SimEvent>(
        &mut self,
        handler: impl Fn(&mut Context, E) + 'static,
    ) {
        let handlers = self
            .event_handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::<Vec<Rc<EventHandler<E>>>>::default());
        if let Some(handlers) = handlers.downcast_mut::<Vec<Rc<EventHandler<E>>>>() {
            handlers.push(Rc::new(handler));
        }
    }

    /// Delivers `event` to every subscriber. Handlers run as callbacks at the current time, in
    /// subscription order.
    pub fn emit_event<E: SimEvent>(&mut self, event: E) {
        let handlers: Vec<Rc<EventHandler<E>>> = match self
            .event_handlers
            .get(&TypeId::of::<E>())
            .and_then(|handlers| handlers.downcast_ref::<Vec<Rc<EventHandler<E>>>>())
        {
            Some(handlers) => handlers.clone(),
            None => return,
        };
        for handler in handlers {
            self.queue_callback(move |context| handler(context, event));
        }
    }

    fn add_plugin<T: DataPlugin>(&mut self) {
        self.data_plugins
            .insert(TypeId::of::<T>(), Box::new(T::create_data_container()));
    }

    /// Returns the data container for `T`, creating it on first use.
    ///
    /// # Panics
    /// Never in practice: the container is inserted under `T`'s own `TypeId`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        let type_id = TypeId::of::<T>();
        if !self.data_plugins.contains_key(&type_id) {
            self.add_plugin::<T>();
        }
        self.data_plugins
            .get_mut(&type_id)
            .and_then(|container| container.downcast_mut::<T::DataContainer>())
            .expect("data plugin stored under the wrong type")
    }

    /// Returns the data container for `T`, or `None` if nothing has created it yet.
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stops the run after the current callback returns. Pending plans are dropped.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at {}", self.current_time);
        self.shutdown_requested = true;
    }

    pub fn execute(&mut self) {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.callback_queue.clear();
                self.plan_queue.clear();
                break;
            }

            // If there is a callback, run it.
            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            // There aren't any callbacks, so look at the first plan.
            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.current_time = plan.time;
                (plan.data)(self);
            } else {
                // OK, there aren't any plans, so we're done.
                break;
            }
        }
        trace!("event loop finished at {}", self.current_time);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
