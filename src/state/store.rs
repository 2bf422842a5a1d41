// ============================================================================
// STORE - Contenedor de estado con dispatch + suscriptores
// ============================================================================
// El estado solo cambia por `dispatch`. Un dispatch lanzado desde un
// suscriptor se encola y se aplica cuando termina el actual.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::state::{reduce, Action, AppState};

type Subscriber = Rc<dyn Fn(&AppState)>;

/// Identificador devuelto por `subscribe`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Store compartido (clonar = otra referencia al mismo estado)
#[derive(Clone)]
pub struct Store {
    state: Rc<RefCell<AppState>>,
    subscribers: Rc<RefCell<Vec<(SubscriptionId, Subscriber)>>>,
    pending: Rc<RefCell<VecDeque<Action>>>,
    dispatching: Rc<Cell<bool>>,
    next_subscription: Rc<Cell<u64>>,
}

impl Store {
    /// Crear store con estado inicial
    pub fn new(initial: AppState) -> Self {
        Self {
            state: Rc::new(RefCell::new(initial)),
            subscribers: Rc::new(RefCell::new(Vec::new())),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            dispatching: Rc::new(Cell::new(false)),
            next_subscription: Rc::new(Cell::new(0)),
        }
    }

    /// Snapshot del estado actual (clonar es barato: slices en Rc)
    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Aplicar una acción y notificar a los suscriptores
    pub fn dispatch(&self, action: Action) {
        self.pending.borrow_mut().push_back(action);
        if self.dispatching.replace(true) {
            return;
        }

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(action) = next else { break };

            let snapshot = {
                let mut state = self.state.borrow_mut();
                *state = reduce(&state, &action);
                state.clone()
            };
            log::debug!("🔁 [STORE] {}", action.name());

            let subscribers: Vec<Subscriber> = self
                .subscribers
                .borrow()
                .iter()
                .map(|(_, subscriber)| subscriber.clone())
                .collect();
            for subscriber in subscribers {
                subscriber(&snapshot);
            }
        }

        self.dispatching.set(false);
    }

    /// Suscribirse a cambios
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AppState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}
