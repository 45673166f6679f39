use goblin_runtime::mock::MockTimer;
use goblin_runtime::{
    ActorService, ExecutorContext, Handle, LifecycleError, Outcome, RuntimeConfig, StateKind,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<(String, &'static str, Outcome)>>>;

struct Fixture {
    primary: ExecutorContext,
    service: ActorService,
    timer: Arc<MockTimer>,
    log: Log,
}

impl Fixture {
    fn new(kill_interval: Option<Duration>) -> Self {
        let primary = ExecutorContext::new("primary");
        let timer = Arc::new(MockTimer::new());
        let config = RuntimeConfig::default()
            .with_kill_interval(kill_interval)
            .unwrap();
        let service = ActorService::with_timer(&primary, config, timer.clone()).unwrap();
        Self {
            primary,
            service,
            timer,
            log: Log::default(),
        }
    }

    fn record(&self, goblin: &Handle, what: &'static str) -> impl FnOnce(Outcome) + Send + 'static {
        let log = self.log.clone();
        let name = goblin.name().to_string();
        move |outcome| log.lock().push((name, what, outcome))
    }

    /// Drains the primary executor, then readies it for the next phase.
    fn settle(&self) {
        self.primary.run();
        self.primary.restart();
    }

    fn entries(&self, what: &str) -> Vec<(String, Outcome)> {
        self.log
            .lock()
            .iter()
            .filter(|(_, w, _)| *w == what)
            .map(|(name, _, outcome)| (name.clone(), outcome.clone()))
            .collect()
    }
}

#[test]
fn test_three_goblins_are_born_and_die_exactly_once() {
    let fx = Fixture::new(None);
    let goblins: Vec<_> = (0..3).map(|_| Handle::new(&fx.service)).collect();
    let names: Vec<_> = goblins.iter().map(|g| g.name().to_string()).collect();
    assert_eq!(names, vec!["yarr!", "gnurgghhh!", "fgumschak!"]);

    for goblin in &goblins {
        goblin.on_birth(fx.record(goblin, "birth"));
        goblin.be_born();
    }
    fx.settle();

    let births = fx.entries("birth");
    assert_eq!(births.len(), 3);
    assert!(births.iter().all(|(_, outcome)| outcome.is_ok()));

    for goblin in &goblins {
        goblin.wait_death(fx.record(goblin, "death"));
        goblin.die();
        goblin.die();
    }
    fx.settle();

    let mut deaths = fx.entries("death");
    deaths.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        deaths,
        vec![
            ("fgumschak!".to_string(), Ok(())),
            ("gnurgghhh!".to_string(), Ok(())),
            ("yarr!".to_string(), Ok(())),
        ]
    );
    assert_eq!(fx.entries("birth").len(), 3, "no birth handler fires twice");
    assert!(goblins.iter().all(Handle::is_dead));
}

#[test]
fn test_birth_requested_after_death_is_actually_dead() {
    let fx = Fixture::new(None);
    let goblin = Handle::new(&fx.service);
    goblin.be_born();
    goblin.die();
    goblin.on_birth(fx.record(&goblin, "birth"));
    goblin.wait_death(fx.record(&goblin, "death"));
    fx.settle();

    assert_eq!(
        fx.entries("birth"),
        vec![("yarr!".to_string(), Err(LifecycleError::ActuallyDead))]
    );
    assert_eq!(fx.entries("death"), vec![("yarr!".to_string(), Ok(()))]);
}

#[test]
fn test_spawned_goblin_reports_birth() {
    let fx = Fixture::new(None);
    let log = fx.log.clone();
    let goblin = Handle::spawned(&fx.service, move |outcome| {
        log.lock().push(("spawned".into(), "birth", outcome))
    });
    assert_eq!(goblin.state(), StateKind::KillingFolk);
    fx.settle();
    assert_eq!(fx.entries("birth"), vec![("spawned".to_string(), Ok(()))]);
}

#[test]
fn test_dying_unborn_never_fires_birth_waiter() {
    let fx = Fixture::new(None);
    let goblin = Handle::new(&fx.service);
    goblin.on_birth(fx.record(&goblin, "birth"));
    goblin.wait_death(fx.record(&goblin, "death"));
    goblin.die();
    fx.settle();

    assert!(fx.entries("birth").is_empty());
    assert_eq!(fx.entries("death"), vec![("yarr!".to_string(), Ok(()))]);
}

#[test]
fn test_dropping_unborn_goblin_aborts_its_death_waiter() {
    let fx = Fixture::new(None);
    let goblin = Handle::new(&fx.service);
    goblin.wait_death(fx.record(&goblin, "death"));
    drop(goblin);
    fx.settle();

    assert_eq!(
        fx.entries("death"),
        vec![("yarr!".to_string(), Err(LifecycleError::Aborted))]
    );
}

#[test]
fn test_registry_does_not_keep_goblins_alive() {
    let fx = Fixture::new(None);
    let keep = Handle::new(&fx.service);
    let gone = Handle::new(&fx.service);
    let gone_ref = gone.to_ref();
    drop(gone);

    assert_eq!(fx.service.registered(), 2);
    let live = fx.service.actors();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0], keep);
    assert!(!gone_ref.is_alive());
    assert_eq!(gone_ref.name(), "gnurgghhh!");
}

#[test]
fn test_handles_from_separate_constructions_are_never_equal() {
    let fx = Fixture::new(None);
    let config = RuntimeConfig {
        names: vec!["same".into()],
        ..RuntimeConfig::default()
    };
    let other = ActorService::with_timer(&fx.primary, config, fx.timer.clone()).unwrap();
    let a = Handle::new(&other);
    let b = Handle::new(&other);
    assert_eq!(a.name(), "same");
    assert_eq!(b.name(), "same 1");
    assert_ne!(a, b);
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_handler_can_reenter_its_goblin() {
    let fx = Fixture::new(None);
    let goblin = Handle::new(&fx.service);
    let me = goblin.to_ref();
    let log = fx.log.clone();
    goblin.on_birth(move |outcome| {
        assert!(outcome.is_ok());
        me.die();
        me.wait_death(move |outcome| log.lock().push(("yarr!".into(), "death", outcome)));
    });
    goblin.be_born();
    fx.settle();

    assert!(goblin.is_dead());
    assert_eq!(fx.entries("death"), vec![("yarr!".to_string(), Ok(()))]);
}

#[test]
fn test_kill_timer_counts_kills_until_death() {
    let fx = Fixture::new(Some(Duration::from_secs(5)));
    let goblin = Handle::new(&fx.service);
    goblin.be_born();
    assert_eq!(fx.timer.delays(), vec![Duration::from_secs(5)]);

    for expected in 1..=2 {
        assert!(fx.timer.fire_next());
        // The follow-up event runs on the service's worker thread.
        for _ in 0..500 {
            if goblin.kills() == expected {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(goblin.kills(), expected);
    }

    goblin.die();
    assert_eq!(fx.timer.pending(), 0, "leaving KillingFolk disarms the timer");
    assert!(!fx.timer.fire_next());
    assert_eq!(goblin.kills(), 2);
}

#[test]
fn test_dying_unborn_while_birth_waiter_owns_last_handle() {
    let fx = Fixture::new(None);
    let goblin = Handle::new(&fx.service);
    let watcher = goblin.to_ref();
    watcher.on_birth(move |_| drop(goblin));

    let (tx, rx) = std::sync::mpsc::channel();
    let dying = watcher.clone();
    thread::spawn(move || {
        dying.die();
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(3))
        .expect("die returns once the abandoned waiter released the goblin");

    assert!(!watcher.is_alive());
    fx.settle();
    assert!(fx.log.lock().is_empty());
}
