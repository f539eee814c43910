//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use ledgerline_core::{Operation, Patch, Record, RecordId};

/// Field names that never collide with `id`, `user_id` or `created_at`.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z]{3,8}".prop_map(String::from)
}

/// A JSON scalar.
pub fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-1_000_000i64..1_000_000).prop_map(Value::from),
        "[A-Za-z ]{0,12}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

pub fn fields(max: usize) -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(field_name(), field_value(), 0..=max)
        .prop_map(|m| m.into_iter().collect())
}

/// A record with a fresh random id.
pub fn record() -> impl Strategy<Value = Record> {
    fields(5).prop_map(Record::new)
}

pub fn patch() -> impl Strategy<Value = Patch> {
    fields(3).prop_map(Patch::from)
}

/// An operation targeting one of `ids` (updates and deletes) or a new
/// record (inserts).
pub fn operation(ids: Vec<RecordId>) -> impl Strategy<Value = Operation> {
    let targets = if ids.is_empty() {
        vec![RecordId::from("missing")]
    } else {
        ids
    };
    prop_oneof![
        record().prop_map(Operation::Insert),
        (prop::sample::select(targets.clone()), patch())
            .prop_map(|(id, patch)| Operation::Update { id, patch }),
        prop::sample::select(targets).prop_map(Operation::Delete),
    ]
}

/// One step of a scripted session against a collection.
///
/// Indices pick among the records added so far, so scripts stay meaningful
/// whatever ids get generated.
#[derive(Debug, Clone)]
pub enum MutationStep {
    Add(Map<String, Value>),
    Update(prop::sample::Index, Patch),
    Remove(prop::sample::Index),
}

impl Arbitrary for MutationStep {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            3 => fields(4).prop_map(MutationStep::Add),
            2 => (any::<prop::sample::Index>(), patch())
                .prop_map(|(i, p)| MutationStep::Update(i, p)),
            1 => any::<prop::sample::Index>().prop_map(MutationStep::Remove),
        ]
        .boxed()
    }
}
