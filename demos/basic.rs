//! Memoizing a plain function with an `Lru` store and the `hashkey!` macro.

use memoize_cache::{hashkey, Cached, Lru};

fn slow_square(n: u64) -> u64 {
    std::thread::sleep(std::time::Duration::from_millis(50));
    n * n
}

fn main() {
    let memo = Cached::new(Lru::<(u64,), u64>::new(64));

    for n in [2, 2, 3, 3, 2] {
        let key = hashkey!(n);
        let v = memo.get_or_compute(key, || slow_square(n));
        println!("square({n}) = {v}");
    }

    let info = memo.cache_info();
    println!("hits={} misses={}", info.hits, info.misses);
}
