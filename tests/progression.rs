use std::cell::RefCell;
use std::rc::Rc;

use contagion::disease::{Branch, ConditionalDuration, ConditionalProbability};
use contagion::prelude::*;

fn setup(seed: u64, population: usize) -> Context {
    let mut context = Context::new();
    context.init_random(seed);
    context.set_progression_model(
        ProgressionModel::from_parameters(&ProgressionParameters::default()).unwrap(),
    );
    for i in 0..population {
        context.add_person(u8::try_from(i % 100).unwrap());
    }
    context
}

fn record_phase_changes(context: &mut Context) -> Rc<RefCell<Vec<(f64, PhaseChangeEvent)>>> {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&changes);
    context.subscribe_to_event(move |context, event: PhaseChangeEvent| {
        recorder
            .borrow_mut()
            .push((context.get_current_time(), event));
    });
    changes
}

#[test]
fn every_exposed_person_ends_recovered_or_dead() {
    let mut context = setup(42, 500);
    let changes = record_phase_changes(&mut context);
    for person_id in context.query_people_in_phase(Phase::Susceptible) {
        context.expose(person_id).unwrap();
    }
    context.execute();

    let counts = context.get_phase_counts();
    assert_eq!(counts.total(), 500);
    assert_eq!(counts.get(Phase::Recovered) + counts.get(Phase::Dead), 500);

    // Each person's changes chain together: the previous phase of one change is the
    // current phase of the change before it.
    let changes = changes.borrow();
    for person_id in context.query_people_in_phase(Phase::Recovered) {
        let mut phase = Phase::Susceptible;
        let mut time = 0.0;
        for (t, event) in changes.iter().filter(|(_, e)| e.person_id == person_id) {
            assert_eq!(event.previous, phase);
            assert!(*t >= time);
            phase = event.current;
            time = *t;
        }
        assert_eq!(phase, Phase::Recovered);
    }
}

#[test]
fn deaths_are_reported_once() {
    let mut parameters = ProgressionParameters {
        fraction_asymptomatic: "0".to_string(),
        fraction_symptomatic_to_hospitalized: "1".to_string(),
        fraction_hospitalized_to_icu: "0".to_string(),
        fraction_hospitalized_to_dead: "0.5".to_string(),
        ..ProgressionParameters::default()
    };
    parameters.period_hospitalized_to_dead = "Constant(2)".to_string();
    let mut context = Context::new();
    context.init_random(3);
    context.set_progression_model(ProgressionModel::from_parameters(&parameters).unwrap());
    for _ in 0..200 {
        let person_id = context.add_person(60);
        context.expose(person_id).unwrap();
    }

    let deaths = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&deaths);
    context.subscribe_to_event(move |_, event: PersonDiedEvent| {
        recorder.borrow_mut().push(event.person_id);
    });
    context.execute();

    let mut deaths = deaths.borrow().clone();
    assert_eq!(deaths.len(), context.get_phase_count(Phase::Dead));
    assert!(deaths.len() > 50 && deaths.len() < 150);
    deaths.sort_unstable();
    deaths.dedup();
    assert_eq!(deaths.len(), context.get_phase_count(Phase::Dead));
}

#[test]
fn same_seed_gives_same_history() {
    let run = |seed: u64| {
        let mut context = setup(seed, 100);
        let changes = record_phase_changes(&mut context);
        for person_id in context.query_people_in_phase(Phase::Susceptible) {
            context.expose(person_id).unwrap();
        }
        context.execute();
        let history = changes.borrow().clone();
        history
    };
    assert_eq!(run(11), run(11));
    assert_ne!(run(11), run(12));
}

#[test]
fn hand_built_model() {
    let mut model = ProgressionModel::new();
    model
        .add_branch(
            Phase::Exposed,
            Branch::new(
                Phase::InfectedSymptomatic,
                "age{0-17: 0, 18-100: 1}".parse::<ConditionalProbability>().unwrap(),
                "Constant(1)".parse::<ConditionalDuration>().unwrap(),
            ),
        )
        .add_branch(
            Phase::Exposed,
            Branch::otherwise(
                Phase::Recovered,
                "Constant(2)".parse::<ConditionalDuration>().unwrap(),
            ),
        )
        .add_branch(
            Phase::InfectedSymptomatic,
            Branch::otherwise(
                Phase::Recovered,
                "Constant(3)".parse::<ConditionalDuration>().unwrap(),
            ),
        );
    assert!(model.validate().is_err());

    // Hospitalized and ICU are never reached but still need a way out.
    for phase in [Phase::InfectedAsymptomatic, Phase::Hospitalized, Phase::Icu] {
        model.add_branch(
            phase,
            Branch::otherwise(
                Phase::Recovered,
                "1".parse::<ConditionalDuration>().unwrap(),
            ),
        );
    }
    model.validate().unwrap();

    let mut context = Context::new();
    context.init_random(1);
    context.set_progression_model(model);
    let child = context.add_person(10);
    let adult = context.add_person(30);
    context.expose(child).unwrap();
    context.expose(adult).unwrap();

    context.add_plan(30.0, move |context| {
        assert_eq!(context.get_person_phase(child), Phase::Exposed);
        assert_eq!(context.get_person_phase(adult), Phase::InfectedSymptomatic);
    });
    context.add_plan(50.0, move |context| {
        assert_eq!(context.get_person_phase(child), Phase::Recovered);
        assert_eq!(context.get_person_phase(adult), Phase::InfectedSymptomatic);
    });
    context.execute();
    assert_eq!(context.get_person_phase(adult), Phase::Recovered);
    assert_eq!(context.get_current_time(), 24.0 + 72.0);
}

#[test]
fn exposing_twice_is_rejected() {
    let mut context = setup(5, 1);
    let person_id = context.query_people_in_phase(Phase::Susceptible)[0];
    context.expose(person_id).unwrap();
    assert!(matches!(
        context.expose(person_id),
        Err(ContagionError::InvalidTransition { .. })
    ));
    assert_eq!(context.get_phase_count(Phase::Exposed), 1);
}
