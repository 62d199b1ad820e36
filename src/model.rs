use crate::{config::SimConfig, Grid, Result, CUSTOM_PRESET};
use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock},
    thread::{self, ThreadId},
};
use tokio::sync::watch;

/// Everything the view layer needs to draw the simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimState {
    grid: Grid,
    fps: u32,
    running: bool,
    show_age: bool,
    active_preset: String,
}

impl SimState {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn show_age(&self) -> bool {
        self.show_age
    }

    /// Name of the last loaded preset, or [`CUSTOM_PRESET`].
    pub fn active_preset(&self) -> &str {
        &self.active_preset
    }
}

type Observer = Arc<dyn Fn(&SimState) + Send + Sync>;

/// Which thread is delivering notifications, and the snapshots it still has
/// to deliver.
#[derive(Default)]
struct Delivery {
    owner: Option<ThreadId>,
    pending: VecDeque<SimState>,
}

/// Owner of the grid and the simulation parameters.
///
/// Every setter applies its change and then synchronously calls all observers,
/// in registration order, on the thread that made the change. Observers get a
/// snapshot taken right after the change, and notifications are delivered in
/// the same order as the changes were made.
///
/// Observers may call back into the model. A change made from inside an
/// observer is applied at once, but its notification is queued and delivered
/// after the current one has reached every observer.
///
/// Grid reads always return copies, so nothing outside can alter the
/// authoritative grid.
pub struct LifeModel {
    state: Mutex<SimState>,
    observers: RwLock<Vec<Observer>>,
    delivery: Mutex<Delivery>,
    delivery_done: Condvar,
    revision: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // every critical section leaves the data consistent, so poisoning is harmless
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Delivery rights of the outermost change on a thread. Released on drop,
/// also when an observer panics, so other threads are never locked out.
struct DeliveryTurn<'a> {
    model: &'a LifeModel,
}

impl Drop for DeliveryTurn<'_> {
    fn drop(&mut self) {
        let mut delivery = lock(&self.model.delivery);
        delivery.owner = None;
        delivery.pending.clear();
        self.model.delivery_done.notify_all();
    }
}

impl LifeModel {
    /// Creates a model holding a dead grid of the configured size.
    pub fn new(config: &SimConfig) -> Result<Self> {
        let grid = Grid::new(config.rows, config.cols)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            state: Mutex::new(SimState {
                grid,
                fps: config.fps.max(1),
                running: false,
                show_age: false,
                active_preset: CUSTOM_PRESET.to_string(),
            }),
            observers: RwLock::new(vec![]),
            delivery: Mutex::new(Delivery::default()),
            delivery_done: Condvar::new(),
            revision,
        })
    }

    /// Registers a callback invoked after every change.
    ///
    /// An observer registered from inside another observer is first called
    /// for the next notification.
    pub fn observe(&self, observer: impl Fn(&SimState) + Send + Sync + 'static) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Returns a receiver whose value is bumped after every change, for
    /// consumers that prefer polling or awaiting over callbacks.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Returns true while the current thread is delivering notifications,
    /// that is when called from inside an observer.
    pub fn is_notifying(&self) -> bool {
        lock(&self.delivery).owner == Some(thread::current().id())
    }

    /// Waits until no other thread is delivering notifications and claims
    /// delivery for this thread. Returns `None` if this thread already
    /// delivers, that is when called from inside an observer.
    fn claim_delivery(&self) -> Option<DeliveryTurn<'_>> {
        let me = thread::current().id();
        let mut delivery = lock(&self.delivery);
        if delivery.owner == Some(me) {
            return None;
        }
        while delivery.owner.is_some() {
            delivery = self
                .delivery_done
                .wait(delivery)
                .unwrap_or_else(PoisonError::into_inner);
        }
        delivery.owner = Some(me);
        Some(DeliveryTurn { model: self })
    }

    /// Applies `f` to the state under the lock, then notifies observers.
    /// Nothing is notified if `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut SimState) -> Result<T>) -> Result<T> {
        // claimed before the state lock, so changes and deliveries keep one order
        let turn = self.claim_delivery();
        let result = {
            let mut state = lock(&self.state);
            let result = f(&mut state)?;
            lock(&self.delivery).pending.push_back(state.clone());
            result
        };
        if turn.is_some() {
            self.deliver_pending();
        }
        Ok(result)
    }

    fn deliver_pending(&self) {
        loop {
            let Some(snapshot) = lock(&self.delivery).pending.pop_front() else {
                break;
            };
            let observers = self
                .observers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            for observer in observers.iter() {
                observer(&snapshot);
            }
            self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        }
    }

    pub fn set_grid(&self, grid: Grid) {
        let _ = self.mutate(|state| {
            state.grid = grid;
            Ok(())
        });
    }

    /// Replaces the grid with `f(current grid)` as one atomic read-modify-write.
    ///
    /// If `f` fails the grid is left unchanged and observers are not called.
    pub fn update_grid(&self, f: impl FnOnce(&Grid) -> Result<Grid>) -> Result<()> {
        self.mutate(|state| {
            state.grid = f(&state.grid)?;
            Ok(())
        })
    }

    /// Like [`LifeModel::update_grid`], but also sets the active preset name
    /// in the same change, so observers never see one without the other.
    pub fn update_grid_with_preset(
        &self,
        name: impl Into<String>,
        f: impl FnOnce(&Grid) -> Result<Grid>,
    ) -> Result<()> {
        let name = name.into();
        self.mutate(|state| {
            state.grid = f(&state.grid)?;
            state.active_preset = name;
            Ok(())
        })
    }

    /// Replaces the grid with a dead grid of the given size.
    pub fn set_grid_size(&self, rows: usize, cols: usize) -> Result<()> {
        let grid = Grid::new(rows, cols)?;
        self.set_grid(grid);
        Ok(())
    }

    /// Zero is raised to one generation per second.
    pub fn set_fps(&self, fps: u32) {
        let _ = self.mutate(|state| {
            state.fps = fps.max(1);
            Ok(())
        });
    }

    pub fn set_running(&self, running: bool) {
        let _ = self.mutate(|state| {
            state.running = running;
            Ok(())
        });
    }

    pub fn set_show_age(&self, show_age: bool) {
        let _ = self.mutate(|state| {
            state.show_age = show_age;
            Ok(())
        });
    }

    pub fn set_active_preset_name(&self, name: impl Into<String>) {
        let name = name.into();
        let _ = self.mutate(|state| {
            state.active_preset = name;
            Ok(())
        });
    }

    /// Copy of the current grid.
    pub fn grid(&self) -> Grid {
        lock(&self.state).grid.clone()
    }

    pub fn grid_size(&self) -> (usize, usize) {
        lock(&self.state).grid.size()
    }

    pub fn fps(&self) -> u32 {
        lock(&self.state).fps
    }

    pub fn running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn show_age(&self) -> bool {
        lock(&self.state).show_age
    }

    pub fn active_preset_name(&self) -> String {
        lock(&self.state).active_preset.clone()
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> SimState {
        lock(&self.state).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LifeError;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn small_model() -> LifeModel {
        LifeModel::new(&SimConfig::default().with_size(4, 5)).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let model = small_model();
        let state = model.snapshot();
        assert_eq!(state.grid().size(), (4, 5));
        assert_eq!(state.grid().population(), 0);
        assert_eq!(state.fps(), 30);
        assert!(!state.running());
        assert!(!state.show_age());
        assert_eq!(state.active_preset(), CUSTOM_PRESET);
    }

    #[test]
    fn test_rejects_zero_sized_config() {
        assert!(matches!(
            LifeModel::new(&SimConfig::default().with_size(0, 3)),
            Err(LifeError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_every_setter_notifies() {
        let model = small_model();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        model.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        model.set_grid(Grid::new(4, 5).unwrap());
        model.set_fps(10);
        model.set_running(true);
        model.set_show_age(true);
        model.set_active_preset_name("glider");
        model.set_grid_size(2, 2).unwrap();
        model.update_grid(|grid| grid.toggled(0, 0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_observers_see_new_state_in_order() {
        let model = small_model();
        let log = Arc::new(Mutex::new(vec![]));
        for id in 0..3 {
            let log = log.clone();
            model.observe(move |state| log.lock().unwrap().push((id, state.fps())));
        }
        model.set_fps(12);
        assert_eq!(*log.lock().unwrap(), vec![(0, 12), (1, 12), (2, 12)]);
    }

    #[test]
    fn test_failed_update_keeps_grid_and_stays_silent() {
        let model = small_model();
        model.update_grid(|grid| grid.toggled(1, 1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        model.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = model.update_grid(|grid| grid.toggled(10, 10));
        assert!(matches!(result, Err(LifeError::OutOfBounds { .. })));
        assert_eq!(model.grid().get(1, 1).unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(model.set_grid_size(0, 1).is_err());
        assert_eq!(model.grid_size(), (4, 5));
    }

    #[test]
    fn test_grid_reads_are_copies() {
        let model = small_model();
        let mut grid = model.grid();
        grid.set(0, 0, 9).unwrap();
        assert_eq!(model.grid().get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_fps_is_positive() {
        let model = small_model();
        model.set_fps(0);
        assert_eq!(model.fps(), 1);
    }

    #[test]
    fn test_revision_channel() {
        let model = small_model();
        let mut rx = model.subscribe();
        assert!(!rx.has_changed().unwrap());
        model.set_show_age(true);
        model.set_show_age(false);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_observer_may_change_the_model() {
        let model = Arc::new(small_model());
        let log = Arc::new(Mutex::new(vec![]));
        let late_calls = Arc::new(AtomicUsize::new(0));
        {
            let weak = Arc::downgrade(&model);
            let (log, late_calls) = (log.clone(), late_calls.clone());
            model.observe(move |state| {
                log.lock().unwrap().push(("first", state.fps(), state.show_age()));
                let Some(model) = weak.upgrade() else {
                    return;
                };
                assert!(model.is_notifying());
                if !state.show_age() {
                    model.set_show_age(true);
                    let late_calls = late_calls.clone();
                    model.observe(move |_| {
                        late_calls.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }
        {
            let log = log.clone();
            model.observe(move |state| {
                log.lock().unwrap().push(("second", state.fps(), state.show_age()));
            });
        }

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let worker = {
            let model = model.clone();
            std::thread::spawn(move || {
                model.set_fps(5);
                done_tx.send(()).unwrap();
            })
        };
        assert!(done_rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .is_ok());
        worker.join().unwrap();

        // the nested change is delivered after the outer one reached everybody
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("first", 5, false),
                ("second", 5, false),
                ("first", 5, true),
                ("second", 5, true),
            ]
        );
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
        assert!(!model.is_notifying());
        assert!(model.show_age());
        assert_eq!(*model.subscribe().borrow(), 2);
    }

    #[test]
    fn test_grid_and_preset_change_together() {
        let model = small_model();
        let seen = Arc::new(Mutex::new(vec![]));
        let log = seen.clone();
        model.observe(move |state| {
            log.lock()
                .unwrap()
                .push((state.grid().population(), state.active_preset().to_string()));
        });
        model
            .update_grid_with_preset("dot", |grid| grid.toggled(1, 1))
            .unwrap();
        assert!(model
            .update_grid_with_preset("nowhere", |grid| grid.toggled(9, 9))
            .is_err());
        assert_eq!(*seen.lock().unwrap(), vec![(1, "dot".to_string())]);
        assert_eq!(model.active_preset_name(), "dot");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let model = Arc::new(LifeModel::new(&SimConfig::default().with_size(1, 64)).unwrap());
        let handles = (0..4)
            .map(|t| {
                let model = model.clone();
                std::thread::spawn(move || {
                    for x in 0..16 {
                        model.update_grid(|grid| grid.toggled(0, t * 16 + x)).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(model.grid().population(), 64);
    }
}
