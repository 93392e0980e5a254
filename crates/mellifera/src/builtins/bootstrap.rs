//! Source-defined builtins: standard-library pieces written in Mellifera
//! and evaluated at startup against the base environment.
//!
//! Each snippet is a complete program that returns its callable (or, for
//! [`ITERATOR`], the prototype map wrapped into the `iterator` metamap).
//! They may reference each other and the base environment freely — nothing
//! is resolved until they are called, which is why the staged
//! initialization in [`crate::interp`] works.

/// The `iterator` prototype. Evaluated first; its map becomes the
/// `iterator` metamap that user iterators extend.
pub const ITERATOR: &str = r#"
let iterator = type {
    .eoi = function() {
        error null; # end-of-iteration
    },
    .next = function(self) {
        error "unimplemented iterator::next";
    },
    .count = function(self) {
        let count = 0;
        for _ in self.* {
            count = count + 1;
        }
        return count;
    },
    .contains = function(self, value) {
        for x in self.* {
            if x == value {
                return true;
            }
        }
        return false;
    },
    .any = function(self, func) {
        for x in self.* {
            if func(x) {
                return true;
            }
        }
        return false;
    },
    .all = function(self, func) {
        for x in self.* {
            if not func(x) {
                return false;
            }
        }
        return true;
    },
    .filter = function(self, func) {
        let filter_iterator = type extends(iterator, {
            .next = function(self) {
                let current = self.base.next();
                while not func(current) {
                    current = self.base.next();
                }
                return current;
            },
        });
        return new filter_iterator {
            .base = self,
        };
    },
    .transform = function(self, func) {
        let transform_iterator = type extends(iterator, {
            .next = function(self) {
                return func(self.base.next());
            },
        });
        return new transform_iterator {
            .base = self,
        };
    },
    .into_vector = function(self) {
        let result = [];
        for x in self.* {
            result.push(x);
        }
        return result;
    },
};
return iterator;
"#;

/// `range(bgn, end)` — a half-open counting iterator.
pub const RANGE: &str = r#"
let range_iterator = type extends(iterator, {
    "init": function(bgn, end) {
        if end < bgn {
            error $"end-of-range {repr(end)} is less than beginning-of-range {repr(bgn)}";
        }
        return new range_iterator {
            .cur = bgn,
            .end = end,
        };
    },
    "next": function(self) {
        if self.cur >= self.end {
            error null; # end-of-iteration
        }
        let result = self.cur;
        self.cur = self.cur + 1;
        return result;
    },
});
let range = function(bgn, end) {
    return range_iterator::init(bgn, end);
};
return range;
"#;

/// `vector::sorted` — merge sort over a snapshot of the vector.
pub const VECTOR_SORTED: &str = r#"
let sort = function(x) {
    if x.count() <= 1 {
        return x;
    }
    let mid = (x.count() / 2).trunc();
    let lo = sort(x.slice(0, mid));
    let hi = sort(x.slice(mid, x.count()));
    let lo_index = 0;
    let hi_index = 0;
    let result = [];
    for _ in x.count() {
        if lo_index == lo.count() {
            result.push(hi[hi_index]);
            hi_index = hi_index + 1;
        }
        elif hi_index == hi.count() {
            result.push(lo[lo_index]);
            lo_index = lo_index + 1;
        }
        elif lo[lo_index] < hi[hi_index] {
            result.push(lo[lo_index]);
            lo_index = lo_index + 1;
        }
        else {
            result.push(hi[hi_index]);
            hi_index = hi_index + 1;
        }
    }
    return result;
};
return function(self) {
    if not ty::is_reference(self) {
        error $"expected reference to vector-like value for argument 0, received {typename(self)}";
    }
    if not ty::is_vector(self.*) {
        error $"expected reference to vector-like value for argument 0, received reference to {typename(self.*)}";
    }
    try { return sort(self.*); } catch err { error err; }
};
"#;

/// `vector::iterator` — adapts a vector reference to the iterator protocol.
pub const VECTOR_ITERATOR: &str = r#"
return function(self) {
    let vector_iterator = type extends(iterator, {
        .next = function(self) {
            if self.index >= self.vector.*.count() {
                return iterator::eoi();
            }
            let current = self.vector.*[self.index];
            self.index = self.index + 1;
            return current;
        },
    });
    return new vector_iterator {
        .vector = self,
        .index = 0,
    };
};
"#;

/// `map::union` — right-biased union of two maps.
pub const MAP_UNION: &str = r#"
return function(a, b) {
    try { a = a.*; } catch { } # &map -> map
    if not ty::is_map(a) or not ty::is_map(b) {
        error $"attempted map::union of values {repr(a)} and {repr(b)}";
    }

    let result = Map{};
    for k, v in a {
        map::insert(result.&, k, v);
    }
    for k, v in b {
        map::insert(result.&, k, v);
    }
    return result;
};
"#;

/// `set::union`.
pub const SET_UNION: &str = r#"
return function(a, b) {
    try { a = a.*; } catch { } # &set -> set
    if not ty::is_set(a) or not ty::is_set(b) {
        error $"attempted set::union of values {repr(a)} and {repr(b)}";
    }

    let result = Set{};
    for x in a {
        set::insert(result.&, x);
    }
    for x in b {
        set::insert(result.&, x);
    }
    return result;
};
"#;

/// `set::intersection`.
pub const SET_INTERSECTION: &str = r#"
return function(a, b) {
    try { a = a.*; } catch { } # &set -> set
    if not ty::is_set(a) or not ty::is_set(b) {
        error $"attempted set::intersection of values {repr(a)} and {repr(b)}";
    }

    let result = Set{};
    for x in a {
        if b.contains(x) {
            set::insert(result.&, x);
        }
    }
    return result;
};
"#;

/// `set::difference`.
pub const SET_DIFFERENCE: &str = r#"
return function(a, b) {
    try { a = a.*; } catch { } # &set -> set
    if not ty::is_set(a) or not ty::is_set(b) {
        error $"attempted set::difference of values {repr(a)} and {repr(b)}";
    }

    let result = Set{};
    for x in a {
        if not b.contains(x) {
            set::insert(result.&, x);
        }
    }
    return result;
};
"#;

/// `assert(condition)`.
pub const ASSERT: &str = r#"
let assert = function(condition) {
    if not condition {
        error "assertion failure";
    }
};
return assert;
"#;

/// `extends(super, t)` — metamap inheritance by map union.
pub const EXTENDS: &str = r#"
let extend = function(super, t) {
    return map::union(super, t);
};
return extend;
"#;

/// `min(a, b)`.
pub const MIN: &str = r#"
let min = function(a, b) {
    if a <= b {
        return a;
    }
    return b;
};
return min;
"#;

/// `max(a, b)`.
pub const MAX: &str = r#"
let max = function(a, b) {
    if a >= b {
        return a;
    }
    return b;
};
return max;
"#;

/// `math::clamp(value, min, max)`.
pub const CLAMP: &str = r#"
let clamp = function(value, min, max) {
    if value < min {
        return min;
    }
    if value > max {
        return max;
    }
    return value;
};
return clamp;
"#;
