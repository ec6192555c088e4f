use gorbe_codegen::scope::{
    Resolution, ScopeChain, ScopeKind, SlotType, TempPool, Temporary, VarKind, VariableClassifier,
};
use gorbe_syntax::node_from_value;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum PoolOp {
    Allocate(SlotType),
    Free(usize),
}

fn slot_type() -> impl Strategy<Value = SlotType> {
    prop_oneof![
        Just(SlotType::Object),
        Just(SlotType::Bool),
        Just(SlotType::Args),
        Just(SlotType::Dict),
        Just(SlotType::Params),
    ]
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => slot_type().prop_map(PoolOp::Allocate),
        2 => any::<usize>().prop_map(PoolOp::Free),
    ]
}

proptest! {
    #[test]
    fn allocation_reuses_smallest_free_slot(ops in prop::collection::vec(pool_op(), 0..64)) {
        let mut pool = TempPool::new();
        let mut used: Vec<Temporary> = Vec::new();
        let mut free: Vec<Temporary> = Vec::new();
        let mut minted = 0u32;

        for op in ops {
            match op {
                PoolOp::Allocate(ty) => {
                    let expected = free
                        .iter()
                        .filter(|t| t.ty() == ty)
                        .min_by_key(|t| t.name())
                        .cloned();
                    let temp = pool.allocate(ty);
                    match expected {
                        Some(expected) => {
                            prop_assert_eq!(&temp, &expected);
                            free.retain(|t| t != &expected);
                        }
                        None => {
                            minted += 1;
                            prop_assert_eq!(temp.index(), minted);
                            prop_assert_eq!(temp.ty(), ty);
                        }
                    }
                    used.push(temp);
                }
                PoolOp::Free(i) => {
                    if !used.is_empty() {
                        let temp = used.remove(i % used.len());
                        pool.free(&temp);
                        free.push(temp);
                    }
                }
            }
        }

        prop_assert_eq!(pool.used_count(), used.len());
        prop_assert_eq!(pool.declarations().len(), minted as usize);
    }

    #[test]
    fn allocation_is_deterministic(types in prop::collection::vec(slot_type(), 1..32)) {
        let run = |types: &[SlotType]| {
            let mut pool = TempPool::new();
            let mut names = Vec::new();
            for (i, ty) in types.iter().enumerate() {
                let temp = pool.allocate(*ty);
                names.push(temp.name());
                if i % 2 == 0 {
                    pool.free(&temp);
                }
            }
            names
        };
        prop_assert_eq!(run(&types), run(&types));
    }
}

#[test]
fn test_declarations_survive_free() {
    let mut pool = TempPool::new();
    let a = pool.allocate(SlotType::Object);
    let b = pool.allocate(SlotType::Bool);
    pool.free(&a);
    pool.free(&b);
    let names: Vec<String> = pool.declarations().iter().map(Temporary::name).collect();
    assert_eq!(names, vec!["πTemp001", "πTemp002"]);
    assert_eq!(pool.used_count(), 0);
}

#[test]
fn test_classifier_keeps_first_occurrence() {
    let body = json!([
        ["assign", ["var_field", ["@ident", "x", [1, 0]]], ["@int", "1", [1, 4]]],
        ["if", ["var_ref", ["@ident", "c", [2, 3]]],
            [["assign", ["var_field", ["@ident", "x", [3, 2]]], ["@int", "2", [3, 6]]]],
            null],
        ["def", ["@ident", "helper", [4, 4]], ["params", null, null, null, null, null, null, null],
            ["bodystmt",
                [["assign", ["var_field", ["@ident", "hidden", [5, 2]]], ["@int", "3", [5, 11]]]],
                null, null, null]]
    ]);
    let program = node_from_value(&json!(["program", body])).unwrap();
    let mut classifier = VariableClassifier::new();
    classifier.add_parameter(&program, "x", 0).unwrap();
    classifier.scan(program.get(1).unwrap()).unwrap();

    let vars = classifier.finish();
    let names: Vec<&str> = vars.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["x", "helper"]);
    assert_eq!(vars["x"].kind, VarKind::Parameter(0));
    assert_eq!(vars["helper"].kind, VarKind::Local);
}

#[test]
fn test_resolution_from_method_in_class() {
    let mut chain = ScopeChain::new();
    chain.push(ScopeKind::Class, "Foo");
    chain.push(ScopeKind::Function, "bar");
    assert_eq!(chain.resolve("Foo"), Resolution::Global);
    chain.pop();
    assert_eq!(chain.resolve("Foo"), Resolution::ClassAttr);
    chain.pop();
    assert!(chain.pop().is_none());
    assert_eq!(chain.depth(), 1);
}

#[test]
fn test_labels_are_scope_local() {
    let mut chain = ScopeChain::new();
    let first = chain.current_mut().gen_label(false);
    let second = chain.current_mut().gen_label(true);
    chain.push(ScopeKind::Function, "f");
    let inner = chain.current_mut().gen_label(true);
    assert_eq!((first.id(), second.id(), inner.id()), (1, 2, 1));
    assert_eq!(chain.current().checkpoints(), vec![1]);
    chain.pop();
    assert_eq!(chain.current().checkpoints(), vec![2]);
    assert_eq!(chain.current().label_count(), 2);
}
