//! A store with one observable array field, watched by an autorun and a
//! reaction.
//!
//! Run with `RUST_LOG=beacon_core=trace` to see the runtime's own events.

use std::error::Error;

use tracing_subscriber::EnvFilter;

use beacon_core::{
    autorun_with, reaction_with, AutorunOptions, Disposer, Observable, ObservableArray,
    ReactionOptions,
};

struct DemoStore {
    observed_array: Observable<ObservableArray<String>>,
}

impl DemoStore {
    fn new() -> Self {
        Self {
            observed_array: Observable::new(letters(&["a", "b", "c", "d"])),
        }
    }
}

fn letters(values: &[&str]) -> ObservableArray<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("beacon_core=info".parse()?))
        .init();

    let store = DemoStore::new();

    let printer = {
        let field = store.observed_array.clone();
        autorun_with(
            move |_| println!("{}", field.get().join(",")),
            AutorunOptions::named("printer"),
        )
    };

    let length_watcher = {
        let field = store.observed_array.clone();
        reaction_with(
            move || field.get().len(),
            |len, previous, reaction: &Disposer| {
                println!("{}: length {:?} -> {len}", reaction.name(), previous);
            },
            ReactionOptions::default().named("length-watcher"),
        )
    };

    // Index write: the autorun re-runs, the length is unchanged.
    store.observed_array.get_untracked().set(1, "b1".into());

    // Push: both re-run.
    store.observed_array.get_untracked().push("e".into());

    // Whole-field reassignment: one write, the old array leaves the graph.
    store.observed_array.set(letters(&["a2", "b2", "c2", "d2"]));

    println!("{}", serde_json::to_string(&store.observed_array)?);

    printer.dispose();
    length_watcher.dispose();

    // Disposed: nothing prints.
    store.observed_array.get_untracked().push("f".into());
    Ok(())
}
