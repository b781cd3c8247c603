use std::path::Path;

use contagion::model;
use contagion::prelude::*;
use tempfile::TempDir;

const POPULATION: usize = 60;

fn run(seed: u64, output_dir: &Path) -> Context {
    let mut context = Context::new();
    context.init_random(seed);
    load_parameters_from_json(&mut context, Path::new("tests/data/parameters.json")).unwrap();
    context.set_output_dir(output_dir.to_path_buf());
    for i in 0..POPULATION {
        context.add_person(u8::try_from(i).unwrap());
    }
    model::init(&mut context).unwrap();

    // Everyone spends every hour of the first ten days at one home.
    let everyone: Vec<PersonId> = context.query_people_in_phase(Phase::Susceptible);
    let everyone = [everyone, context.query_people_in_phase(Phase::Exposed)].concat();
    for hour in 0..240 {
        let present = everyone.clone();
        context.add_plan(f64::from(hour), move |context| {
            let registry = context.get_location_types();
            let snapshot = LocationSnapshot {
                location_id: LocationId(0),
                location_type: registry.resolve("home").unwrap(),
                total_area: 50.0,
                sub_locations: 1,
                present: &present,
            };
            context.infect_location(&snapshot, 1.0).unwrap();
        });
    }
    context.execute();
    context
}

fn count_rows(path: &Path) -> usize {
    csv::Reader::from_path(path).unwrap().records().count()
}

#[test]
fn seeded_run_is_consistent_with_its_reports() {
    let output = TempDir::new().unwrap();
    let context = run(8, output.path());

    assert_eq!(context.get_transmission_model_name(), Some("distance"));
    let counts = context.get_phase_counts();
    assert_eq!(counts.total(), POPULATION);
    assert_eq!(
        counts.get(Phase::Susceptible) + counts.get(Phase::Recovered) + counts.get(Phase::Dead),
        POPULATION
    );

    let infections = context.get_infection_count();
    // Seeded infections are counted too but belong to no location.
    assert_eq!(infections, POPULATION - counts.get(Phase::Susceptible));
    let home = context.get_location_types().resolve("home").unwrap().id;
    assert_eq!(context.get_infection_count_at_location_type(home), infections - 5);
    assert_eq!(context.get_phase_entry_count(Phase::Exposed), infections);
    assert_eq!(context.get_death_count(), counts.get(Phase::Dead));

    assert_eq!(count_rows(&output.path().join("infections.csv")), infections);
    assert_eq!(
        count_rows(&output.path().join("deaths.csv")),
        context.get_death_count()
    );

    let mut reader = csv::Reader::from_path(output.path().join("phase_counts.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "time");
    assert_eq!(&headers[8], "Dead");
    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        let time: f64 = record[0].parse().unwrap();
        assert!((time % 24.0).abs() < 1e-9);
        let total: usize = (1..=8).map(|i| record[i].parse::<usize>().unwrap()).sum();
        assert_eq!(total, POPULATION);
        rows += 1;
    }
    assert!(rows >= 10);
}

#[test]
fn same_seed_writes_same_infections() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let a = run(21, first.path());
    let b = run(21, second.path());
    assert_eq!(a.get_infection_count(), b.get_infection_count());
    assert_eq!(a.get_phase_counts().get(Phase::Dead), b.get_phase_counts().get(Phase::Dead));

    let read = |dir: &Path| std::fs::read_to_string(dir.join("infections.csv")).unwrap();
    assert_eq!(read(first.path()), read(second.path()));
}

#[test]
fn missing_parameters_file_is_an_error() {
    let mut context = Context::new();
    assert!(matches!(
        load_parameters_from_json(&mut context, Path::new("tests/data/missing.json")),
        Err(ContagionError::IoError(_))
    ));
}
