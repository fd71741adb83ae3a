//! Benchmark utilities.

use persist_core::RecordEngine;
use rand::Rng;

/// Generate a random telephone number.
pub fn random_telnum() -> String {
    let mut rng = rand::thread_rng();
    format!("555-{:04}", rng.gen_range(0..10_000))
}

/// Generate `count` distinct phone book identities, `per_household`
/// people to a last name.
pub fn generate_people(count: usize, per_household: usize) -> Vec<(String, String)> {
    let per_household = per_household.max(1);
    (0..count)
        .map(|i| (format!("H{:05}", i / per_household), format!("P{:03}", i % per_household)))
        .collect()
}

/// Generate stored rows for a `[last, first, telnum, age]` layout.
pub fn generate_rows(count: usize) -> Vec<Vec<String>> {
    let mut rng = rand::thread_rng();
    generate_people(count, 8)
        .into_iter()
        .map(|(last, first)| vec![last, first, random_telnum(), rng.gen_range(0..100).to_string()])
        .collect()
}

/// Insert `count` people through `engine`.
pub fn populate(engine: &mut RecordEngine, count: usize) {
    let mut rng = rand::thread_rng();
    for (last, first) in generate_people(count, 8) {
        engine.clear();
        engine.set("lastname", last).unwrap();
        engine.set("firstname", first).unwrap();
        engine.set("telnum", random_telnum()).unwrap();
        engine.set("age", f64::from(rng.gen_range(0u32..100))).unwrap();
        engine.insert().unwrap();
    }
}
