//! Shares pooled entries between threads and prints the pool statistics.
//!
//! Run with `cargo run --example rcp_entry`.

use std::sync::Arc;
use std::thread;

use nm::Report;
use refcount_pool::{PooledEntry, RefCountable};

fn main() {
    let pool = PooledEntry::<u64>::pool();

    for round in 0..3 {
        let entry = PooledEntry::new(&pool, format!("round_{round}"), round);

        let readers = (0..4)
            .map(|reader| {
                entry.increment_reference_count();
                let entry = Arc::clone(&entry);

                thread::spawn(move || {
                    println!(
                        "reader {reader} sees {} = {:?}",
                        entry.field(),
                        entry.value()
                    );
                    entry.decrement_reference_count();
                })
            })
            .collect::<Vec<_>>();

        // Our own reference goes away first; the last reader recycles the entry.
        entry.decrement_reference_count();

        for reader in readers {
            reader.join().unwrap();
        }

        println!("after round {round}: {}", pool.stats());
    }

    // Three rounds, one allocation.
    assert_eq!(pool.stats().allocated(), 1);

    println!();
    println!("{}", Report::collect());
}
