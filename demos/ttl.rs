//! A `Ttl` cache expiring entries 3 seconds after insertion.

use memoize_cache::{Store, Ttl};

fn main() {
    let mut cache: Ttl<&str, &str> = Ttl::new(16, 3);
    cache.insert("session", "abc123").unwrap();
    println!("just inserted: {:?}", cache.get(&"session"));

    std::thread::sleep(std::time::Duration::from_secs(4));
    println!("after expiry: {:?}", cache.get(&"session"));
}
