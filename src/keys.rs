//! Cache-key construction, mirroring `cachetools.keys`.
//!
//! Python builds a key from an arbitrary `*args, **kwargs` call at runtime.
//! Rust has neither variadic functions nor implicit runtime typing, so the
//! equivalent here is a macro that captures a call's argument list as a
//! tuple: `hashkey!(a, b, c)` expands to `(a.clone(), b.clone(), c.clone())`,
//! which is already `Hash + Eq` whenever its members are. `typedkey!`
//! additionally threads each argument's `TypeId` into the key, so e.g.
//! `typedkey!(1i32)` and `typedkey!(1i64)` never collide even though the
//! plain tuple `(1i32,)` and `(1i64,)` would compare unequal only by luck of
//! differing element types (they can't even share a `hashkey!` type, but a
//! generic wrapper calling this through a type parameter can still want the
//! distinction made explicit).

/// Identity pass-through: the caller's already-built tuple of argument
/// values *is* the key. Exists so generic wrapper code can call `hashkey`
/// uniformly whether the key was built by hand or via the [`hashkey`]
/// macro of the same name.
pub fn hashkey<K>(args: K) -> K {
    args
}

/// Pairs a pre-built key with a type-identity tag.
pub fn typedkey<K, T>(args: K, types: T) -> (T, K) {
    (types, args)
}

/// Builds a key tuple from a call's positional arguments.
#[macro_export]
macro_rules! hashkey {
    ($($arg:expr),* $(,)?) => {
        ($($arg.clone(),)*)
    };
}

/// Like [`hashkey!`], but tags the key with each argument's `TypeId` so
/// values that are `==` but differently typed land in different slots.
#[macro_export]
macro_rules! typedkey {
    ($($arg:expr),* $(,)?) => {
        (
            ($((&$arg as &dyn ::std::any::Any).type_id(),)*),
            ($($arg.clone(),)*)
        )
    };
}

/// Like [`hashkey!`], but drops a leading receiver argument first, so every
/// instance of a type shares one cache key space under a method memoizer.
#[macro_export]
macro_rules! methodkey {
    ($self_:expr $(, $arg:expr)*) => {
        $crate::hashkey!($($arg),*)
    };
}

/// The receiver-dropping counterpart to [`typedkey!`].
#[macro_export]
macro_rules! typedmethodkey {
    ($self_:expr $(, $arg:expr)*) => {
        $crate::typedkey!($($arg),*)
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn hashkey_builds_tuple() {
        let a = 1;
        let b = "x";
        let k = hashkey!(a, b);
        assert_eq!(k, (1, "x"));
    }

    #[test]
    fn methodkey_drops_receiver() {
        struct Widget;
        let w = Widget;
        let a = 7;
        let k = methodkey!(&w, a);
        assert_eq!(k, (7,));
    }

    #[test]
    fn typedkey_distinguishes_types() {
        let a: i32 = 1;
        let b: i64 = 1;
        let ka = typedkey!(a);
        let kb = typedkey!(b);
        assert_ne!(ka.0, kb.0);
    }
}
