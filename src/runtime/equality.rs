//! Structural equality.
//!
//! Comparison walks both graphs with an explicit work list, so neither deep
//! nesting nor cycles can exhaust the native stack. A composite that is
//! already being compared on the current path counts as equal when it is
//! reached again; the set of blocks on the path is private to one call and
//! never written into the heap.

use std::collections::HashSet;

use super::{
    char::masked_utf8,
    number::{decode_word, is_number_word, number_equal},
    object::{
        BlockRef, HeapKind, ADT_MODULE_OFFSET, ADT_TYPE_OFFSET, ADT_VARIANT_OFFSET,
        RECORD_MODULE_OFFSET, RECORD_TYPE_OFFSET,
    },
    value::{Value, Word},
};

enum Task {
    Compare(Word, Word),
    /// Leaves a composite pair: drops whichever addresses the matching
    /// `Compare` put on the path.
    Leave(usize, Option<usize>),
}

/// Deep equality. Consumes both references.
pub fn equal(x: Value, y: Value) -> bool {
    equal_ref(&x, &y)
}

/// Deep equality over borrowed references.
pub fn equal_ref(x: &Value, y: &Value) -> bool {
    Comparison::default().run(x.word(), y.word())
}

#[derive(Default)]
struct Comparison {
    path: HashSet<usize>,
    tasks: Vec<Task>,
}

impl Comparison {
    fn run(mut self, x: Word, y: Word) -> bool {
        self.tasks.push(Task::Compare(x, y));

        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Compare(x, y) => {
                    if !self.compare(x, y) {
                        return false;
                    }
                }
                Task::Leave(x, y) => {
                    self.path.remove(&x);
                    if let Some(y) = y {
                        self.path.remove(&y);
                    }
                }
            }
        }

        true
    }

    /// Compares the shallow parts of `x` and `y`, scheduling their fields.
    fn compare(&mut self, x: Word, y: Word) -> bool {
        if x == y {
            return true;
        }

        if is_number_word(x) && is_number_word(y) {
            return match (decode_word(x), decode_word(y)) {
                (Some(a), Some(b)) => number_equal(a, b),
                _ => false,
            };
        }

        if !x.is_heap_ptr() || !y.is_heap_ptr() {
            return false;
        }

        let (a, b) = (x.block(), y.block());
        let kind = a.kind();
        if kind != b.kind() {
            return false;
        }

        match kind {
            HeapKind::String | HeapKind::Bytes => unsafe { a.bytes() == b.bytes() },
            HeapKind::Char => masked_utf8(a) == masked_utf8(b),
            // Boxed numbers were settled above; code has no structure.
            HeapKind::BoxedNum | HeapKind::Closure => false,
            HeapKind::Tuple | HeapKind::Array => self.compare_fields(a, b),
            HeapKind::Record => {
                same_u32s(a, b, &[RECORD_MODULE_OFFSET, RECORD_TYPE_OFFSET])
                    && self.compare_fields(a, b)
            }
            HeapKind::Adt => {
                same_u32s(a, b, &[ADT_MODULE_OFFSET, ADT_TYPE_OFFSET, ADT_VARIANT_OFFSET])
                    && self.compare_fields(a, b)
            }
        }
    }

    fn compare_fields(&mut self, a: BlockRef, b: BlockRef) -> bool {
        let count = a.field_count();
        if count != b.field_count() {
            return false;
        }

        if self.path.contains(&a.addr()) {
            return true;
        }
        self.path.insert(a.addr());
        let b_entered = self.path.insert(b.addr()).then(|| b.addr());
        self.tasks.push(Task::Leave(a.addr(), b_entered));

        // Reversed so fields are compared first to last.
        for i in (0..count).rev() {
            self.tasks.push(Task::Compare(a.field(i), b.field(i)));
        }
        true
    }
}

fn same_u32s(a: BlockRef, b: BlockRef, offsets: &[usize]) -> bool {
    offsets.iter().all(|&offset| a.u32_at(offset) == b.u32_at(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{
        char::make_char,
        composite::{record_set, tuple_set},
        factory::*,
        hash::hash_value,
        heap::stats,
        number::*,
        object::CHAR_UTF8_OFFSET,
        string::string_concat,
    };

    fn int(x: i64) -> Value {
        Value::simple(x).unwrap()
    }

    #[test]
    fn immediates() {
        assert!(equal(Value::bool(true), Value::bool(true)));
        assert!(!equal(Value::bool(true), Value::bool(false)));
        assert!(!equal(Value::void(), Value::bool(false)));
        assert!(equal(Value::empty(), Value::empty()));
        assert!(!equal(Value::empty(), int(0)));
        assert!(equal(int(-5), int(-5)));
    }

    #[test]
    fn numbers_across_widths() {
        assert!(equal(int(7), make_int32(7)));
        assert!(equal(make_int64(7), make_float64(7.0)));
        assert!(!equal(make_float64(f64::NAN), make_float64(f64::NAN)));
        assert!(!equal(int(1), Value::bool(true)));

        let nan = make_float64(f64::NAN);
        assert!(equal(nan.clone(), nan), "identical blocks short-circuit");
    }

    #[test]
    fn strings_and_bytes() {
        let built = string_concat(&make_string("hello, "), &make_string("world")).unwrap();
        assert!(equal(built, make_string("hello, world")));
        assert!(!equal(make_string("abc"), make_string("abd")));
        assert!(!equal(make_string("abc"), make_string("abcd")));
        assert!(equal(make_string(""), make_string("")));
    }

    #[test]
    fn chars() {
        assert!(equal(make_char('é'), make_char('é')));
        assert!(!equal(make_char('é'), make_char('è')));

        let noisy = make_char('a');
        noisy.word().block().set_u32_at(CHAR_UTF8_OFFSET, 0xabcd_ef61);
        assert!(equal(noisy, make_char('a')));
    }

    #[test]
    fn composites() {
        let a = make_tuple(vec![int(1), make_string("x"), make_array(vec![int(2)])]);
        let b = make_tuple(vec![int(1), make_string("x"), make_array(vec![int(2)])]);
        assert!(equal(a.clone(), b.clone()));
        assert!(!equal(a, make_array(vec![int(1), make_string("x")])));
        assert!(!equal(b, make_tuple(vec![int(1), make_string("x"), make_array(vec![int(3)])])));
        assert!(!equal(make_tuple(vec![int(1)]), make_tuple(vec![int(1), int(2)])));
    }

    #[test]
    fn records_and_variants_compare_their_ids() {
        assert!(equal(make_record(1, 2, vec![int(3)]), make_record(1, 2, vec![int(3)])));
        assert!(!equal(make_record(1, 2, vec![int(3)]), make_record(1, 5, vec![int(3)])));
        assert!(equal(make_adt(0, 1, 2, vec![int(3)]), make_adt(0, 1, 2, vec![int(3)])));
        assert!(!equal(make_adt(0, 1, 2, vec![int(3)]), make_adt(0, 1, 3, vec![int(3)])));
        assert!(!equal(make_adt(0, 1, 2, vec![]), make_adt(9, 1, 2, vec![])));
    }

    #[test]
    fn closures_compare_by_identity() {
        let c = make_closure(1, 4, vec![]);
        assert!(equal(c.clone(), c));
        assert!(!equal(make_closure(1, 4, vec![]), make_closure(1, 4, vec![])));
    }

    #[test]
    fn self_referential_record() {
        let r = make_record(1, 1, vec![Value::void(), int(3)]);
        record_set(&r, 0, r.clone()).unwrap();
        let s = make_record(1, 1, vec![Value::void(), int(3)]);
        record_set(&s, 0, s.clone()).unwrap();

        assert!(equal_ref(&r, &r));
        assert!(equal_ref(&r, &s));
        assert!(equal_ref(&s, &r));

        let t = make_record(1, 1, vec![Value::void(), int(4)]);
        record_set(&t, 0, t.clone()).unwrap();
        assert!(!equal_ref(&r, &t));

        // Break the cycles so the blocks are reclaimed.
        for v in [&r, &s, &t] {
            record_set(v, 0, Value::void()).unwrap();
        }
    }

    #[test]
    fn indirect_cycles() {
        let a = make_tuple(vec![int(1), Value::void()]);
        let b = make_tuple(vec![int(1), a.clone()]);
        tuple_set(&a, 1, b.clone()).unwrap();

        let one = make_tuple(vec![int(1), Value::void()]);
        tuple_set(&one, 1, one.clone()).unwrap();

        assert!(equal_ref(&a, &a));
        assert!(equal_ref(&a, &b));
        assert!(equal_ref(&a, &one));
        assert!(equal_ref(&one, &b));
        assert_eq!(hash_value(&a), hash_value(&one));

        let c = make_tuple(vec![int(2), Value::void()]);
        let d = make_tuple(vec![int(1), c.clone()]);
        tuple_set(&c, 1, d.clone()).unwrap();
        assert!(!equal_ref(&d, &one));

        tuple_set(&a, 1, Value::void()).unwrap();
        tuple_set(&one, 1, Value::void()).unwrap();
        tuple_set(&c, 1, Value::void()).unwrap();
    }

    #[test]
    fn wrapper_around_a_cycle() {
        let r = make_record(1, 1, vec![Value::void(), int(3)]);
        record_set(&r, 0, r.clone()).unwrap();
        let wrapper = make_record(1, 1, vec![r.clone(), int(3)]);

        assert!(equal_ref(&wrapper, &r));
        assert!(equal_ref(&r, &wrapper));
        assert_eq!(hash_value(&wrapper), hash_value(&r));

        let other = make_record(1, 1, vec![r.clone(), int(4)]);
        assert!(!equal_ref(&other, &r));

        record_set(&r, 0, Value::void()).unwrap();
    }

    #[test]
    fn mismatch_leaves_values_reusable() {
        let a = make_tuple(vec![Value::void(), int(1)]);
        tuple_set(&a, 0, a.clone()).unwrap();
        let b = make_tuple(vec![Value::void(), int(2)]);
        tuple_set(&b, 0, b.clone()).unwrap();

        assert!(!equal_ref(&a, &b));
        assert!(equal_ref(&a, &a.clone()));
        assert!(equal_ref(&b, &b));

        tuple_set(&a, 0, Value::void()).unwrap();
        tuple_set(&b, 0, Value::void()).unwrap();
    }

    #[test]
    fn deep_structures() {
        let before = stats().live_blocks;
        let mut x = Value::void();
        let mut y = Value::void();
        for i in 0..100_000 {
            x = make_tuple(vec![int(i), x]);
            y = make_tuple(vec![int(i), y]);
        }
        assert!(equal(x, y));
        assert_eq!(stats().live_blocks, before);
    }
}
