//! Integration tests for toyscope-core
//!
//! These drive the public rendering entry points over mock heaps and
//! snapshots laid out like a running toyscript interpreter.

use toyscope_core::process::{MockElement, MockHeap, MockMemoryReader};
use toyscope_core::{
    Cell, ElementStyle, Error, Inspector, InspectorConfig, Layout, LayoutPreset, ReadMemory,
    RenderOptions, SnapshotFile, SnapshotReader, TraversalLimit, TypeRef, render_cell,
};

fn render(heap: MockHeap, address: u64, ty: &str) -> toyscope_core::Result<Option<String>> {
    render_with(heap, address, ty, RenderOptions::default())
}

fn render_with(
    heap: MockHeap,
    address: u64,
    ty: &str,
    options: RenderOptions,
) -> toyscope_core::Result<Option<String>> {
    let layout = heap.layout().clone();
    Inspector::new(heap.build())
        .with_layout(layout)
        .with_options(options)
        .render(&Cell::new(address, TypeRef::parse(ty)))
}

mod string_tests {
    use super::*;

    #[test]
    fn test_ascii_exact_content() {
        let text = "x".repeat(4096);
        let mut heap = MockHeap::new(Layout::default());
        let cell = heap.string(&text);

        let out = render(heap, cell, "String").unwrap().unwrap();
        assert_eq!(out, format!("'{}'", text));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut heap = MockHeap::new(Layout::default());
        let cell = heap.alloc(16);
        heap.write_string(cell, &[b'a', 0xC3, b'b', 0x80]);

        let out = render(heap, cell, "String").unwrap().unwrap();
        assert_eq!(out, "'a\u{FFFD}b\u{FFFD}'");
    }

    #[test]
    fn test_identifier() {
        let mut heap = MockHeap::new(Layout::default());
        let cell = heap.identifier("counter");

        assert_eq!(render(heap, cell, "Identifier").unwrap().unwrap(), "Id{'counter'}");
    }
}

mod namespace_tests {
    use super::*;

    #[test]
    fn test_sparse_table_stops_after_count() {
        let mut heap = MockHeap::new(Layout::default());
        let ns = heap.namespace(
            8,
            &[
                (4, "b", MockElement::Int(2)),
                (1, "a", MockElement::Int(1)),
                (6, "c", MockElement::Int(3)),
            ],
            None,
        );
        let slots = heap.namespace_slots(ns);
        heap.mark_unreadable(slots + 7 * 8, 8);

        let out = render(heap, ns, "Namespace").unwrap().unwrap();
        assert_eq!(out, "NS{'a': 1 'b': 2 'c': 3}");
    }

    #[test]
    fn test_three_scope_chain() {
        let mut heap = MockHeap::new(Layout::default());
        let root = heap.namespace(4, &[(0, "print", MockElement::Builtin)], None);
        let parent = heap.namespace(4, &[(2, "n", MockElement::Int(10))], Some(root));
        let child = heap.namespace(4, &[(3, "i", MockElement::Int(0))], Some(parent));

        let out = render(heap, child, "Namespace").unwrap().unwrap();
        assert_eq!(
            out,
            "NS{'i': 0}<-NS{'n': 10}<-NS{'print': builtin(not implemented)}"
        );
        assert_eq!(out.matches("<-").count(), 2);
        assert_eq!(out.matches("'i'").count(), 1);
    }

    #[test]
    fn test_keys_only_never_reads_values() {
        let mut heap = MockHeap::new(Layout::default());
        let ns = heap.namespace(
            4,
            &[(0, "a", MockElement::Int(1)), (3, "b", MockElement::Int(2))],
            None,
        );
        let slots = heap.namespace_slots(ns);
        for slot in [0, 3] {
            let pair = heap.read_word(slots + slot * 8);
            heap.mark_unreadable(pair + 16, 40);
        }

        let options = RenderOptions {
            include_values: false,
            ..RenderOptions::default()
        };
        assert_eq!(
            render_with(heap, ns, "Namespace", options).unwrap().unwrap(),
            "NS{'a' 'b'}"
        );
    }

    #[test]
    fn test_self_referential_chain_fails() {
        let mut heap = MockHeap::new(Layout::default());
        let ns = heap.namespace(2, &[(0, "x", MockElement::Null)], None);
        heap.write_ptr(ns + 32, ns);

        match render(heap, ns, "Namespace").unwrap_err() {
            Error::CycleOrDepthExceeded { address, limit } => {
                assert_eq!(address, ns);
                assert_eq!(limit, TraversalLimit::Cycle);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_environment_renders_scope_chain() {
        let mut heap = MockHeap::new(Layout::default());
        let global = heap.namespace(2, &[(0, "g", MockElement::Bool(true))], None);
        let local = heap.namespace(2, &[(1, "l", MockElement::str("v"))], Some(global));
        let env = heap.environment(local);

        assert_eq!(
            render(heap, env, "struct Environment").unwrap().unwrap(),
            "NS{'l': 'v'}<-NS{'g': true}"
        );
    }
}

mod element_tests {
    use super::*;

    #[test]
    fn test_int_list_bare() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::List(vec![
            MockElement::Int(1),
            MockElement::Int(2),
            MockElement::Int(3),
        ]));

        assert_eq!(render(heap, el, "Element").unwrap().unwrap(), "[1 2 3]");
    }

    #[test]
    fn test_empty_list() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::List(vec![]));

        assert_eq!(render(heap, el, "Element").unwrap().unwrap(), "[]");
    }

    #[test]
    fn test_unknown_tag_marker_keeps_siblings() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::List(vec![
            MockElement::Int(1),
            MockElement::Tag(77),
            MockElement::str("z"),
        ]));

        assert_eq!(
            render(heap, el, "Element").unwrap().unwrap(),
            "[1 <unknown element tag 77> 'z']"
        );
    }

    #[test]
    fn test_function_and_return() {
        let mut heap = MockHeap::new(Layout::default());
        let func = heap.element(&MockElement::Function {
            params: vec!["x".to_string()],
            closure: 0x2000,
        });
        let ret = heap.element(&MockElement::Return(Box::new(MockElement::Int(1))));
        let layout = heap.layout().clone();
        let inspector = Inspector::new(heap.build()).with_layout(layout);

        let render = |address| {
            inspector
                .render(&Cell::new(address, TypeRef::new("Element")))
                .unwrap()
                .unwrap()
        };
        assert_eq!(render(func), "fn([Id{'x'}]) ns=0x2000");
        assert_eq!(render(ret), "return 1");
    }

    #[test]
    fn test_tagged_style() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::List(vec![
            MockElement::Int(1),
            MockElement::Error("boom".to_string()),
        ]));
        let options = RenderOptions {
            style: ElementStyle::Tagged,
            ..RenderOptions::default()
        };

        assert_eq!(
            render_with(heap, el, "Element", options).unwrap().unwrap(),
            "[El|INT, 1| El|ERR, 'boom'|]"
        );
    }

    #[test]
    fn test_cyclic_list_fails() {
        let mut heap = MockHeap::new(Layout::default());
        let header = heap.elem_list(&[MockElement::Int(1)]);
        let node = heap.read_word(header + 8);
        heap.write_ptr(node + 40, node);

        let err = render(heap, header, "ElemList").unwrap_err();
        assert!(err.is_traversal_limit());
    }
}

mod dispatch_tests {
    use super::*;

    #[test]
    fn test_unknown_type_returns_none() {
        let reader = MockMemoryReader::new(vec![0; 64]);
        let cell = Cell::new(0x1000, TypeRef::parse("struct Parser *"));

        assert_eq!(render_cell(&reader, &cell, &RenderOptions::default()).unwrap(), None);
    }

    #[test]
    fn test_pointer_cell_is_dereferenced() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::Int(5));
        let ptr = heap.pointer_to(el);

        assert_eq!(render(heap, ptr, "Element *").unwrap().unwrap(), "5");
    }

    #[test]
    fn test_null_pointer_renders_null() {
        let mut heap = MockHeap::new(Layout::default());
        let ptr = heap.pointer_to(0);

        assert_eq!(render(heap, ptr, "const Namespace *").unwrap().unwrap(), "NULL");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let mut heap = MockHeap::new(Layout::default());
        let root = heap.namespace(4, &[(1, "a", MockElement::List(vec![MockElement::Int(1)]))], None);
        let child = heap.namespace(2, &[(0, "b", MockElement::str("s"))], Some(root));
        let reader = heap.build();
        let cell = Cell::new(child, TypeRef::new("Namespace"));

        let first = render_cell(&reader, &cell, &RenderOptions::default()).unwrap();
        let second = render_cell(&reader, &cell, &RenderOptions::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("NS{'b': 's'}<-NS{'a': [1]}"));
    }

    #[test]
    fn test_list_pointer_at_address_space_end_fails() {
        let mut heap = MockHeap::new(Layout::default());
        let el = heap.element(&MockElement::List(vec![]));
        heap.write_ptr(el + 8, u64::MAX - 3);
        let reader = heap.build();
        let snapshot =
            SnapshotReader::from_file(SnapshotFile::capture(&reader, &[(el, 40)]).unwrap()).unwrap();

        let cell = Cell::new(el, TypeRef::new("Element"));
        match render_cell(&snapshot, &cell, &RenderOptions::default()).unwrap_err() {
            Error::MemoryReadFailed { address, .. } => assert_eq!(address, u64::MAX - 3),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_namespace_pointers_at_address_space_end_fail() {
        let mut heap = MockHeap::new(Layout::default());
        let ns = heap.namespace(4, &[(1, "a", MockElement::Int(1))], None);
        heap.write_ptr(ns + 24, u64::MAX - 8);
        let slots_overflow = heap.build();

        let mut heap = MockHeap::new(Layout::default());
        let ns_chain = heap.namespace(1, &[(0, "a", MockElement::Int(1))], None);
        // Claim a second entry so the walk follows the first pair's `next`.
        heap.write_u64(ns_chain + 8, 2);
        let pair = heap.read_word(heap.namespace_slots(ns_chain));
        heap.write_ptr(pair + 56, u64::MAX - 16);
        let next_overflow = heap.build();

        for (reader, ns) in [(slots_overflow, ns), (next_overflow, ns_chain)] {
            let cell = Cell::new(ns, TypeRef::new("Namespace"));
            let err = render_cell(&reader, &cell, &RenderOptions::default()).unwrap_err();
            assert!(matches!(err, Error::MemoryReadFailed { .. }), "{}", err);
        }
    }

    #[test]
    fn test_unreadable_memory_propagates() {
        let reader = MockMemoryReader::new(vec![0; 16]);
        let cell = Cell::new(0x9000, TypeRef::new("String"));

        assert!(matches!(
            render_cell(&reader, &cell, &RenderOptions::default()).unwrap_err(),
            Error::MemoryReadFailed { .. }
        ));
    }
}

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_render_from_saved_snapshot() {
        let mut heap = MockHeap::new(Layout::default());
        let ns = heap.namespace(4, &[(2, "answer", MockElement::Int(42))], None);
        let reader = heap.build();
        let base = reader.base_address();
        let len = reader.len();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heap.json");
        SnapshotFile::capture(&reader, &[(base, len)])
            .unwrap()
            .save(&path)
            .unwrap();

        let snapshot = SnapshotReader::load(&path).unwrap();
        let cell = Cell::new(ns, TypeRef::new("Namespace"));
        assert_eq!(
            render_cell(&snapshot, &cell, &RenderOptions::default()).unwrap().as_deref(),
            Some("NS{'answer': 42}")
        );
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_drives_inspector() {
        let config = InspectorConfig::parse(
            r#"
            [render]
            include_values = false
            "#,
        )
        .unwrap();

        let mut heap = MockHeap::new(config.layout.clone());
        let ns = heap.namespace(2, &[(0, "k", MockElement::Int(1))], None);
        let inspector = Inspector::from_config(heap.build(), config);

        assert_eq!(
            inspector
                .render(&Cell::new(ns, TypeRef::new("Namespace")))
                .unwrap()
                .as_deref(),
            Some("NS{'k'}")
        );
    }
}

mod ilp32_tests {
    use super::*;

    fn heap32() -> MockHeap {
        MockHeap::new(Layout::ilp32())
    }

    #[test]
    fn test_namespace_with_bucket_chain() {
        let mut heap = heap32();
        let ns = heap.namespace(
            4,
            &[
                (2, "z", MockElement::Int(-1)),
                (1, "x", MockElement::str("ab")),
                (1, "y", MockElement::Bool(false)),
            ],
            None,
        );
        // Slot stride is 4; slot 3 is never read once `len` pairs were found.
        let slots = heap.namespace_slots(ns);
        heap.mark_unreadable(slots + 3 * 4, 4);

        assert_eq!(
            render(heap, ns, "Namespace").unwrap().unwrap(),
            "NS{'x': 'ab' 'y': false 'z': -1}"
        );
    }

    #[test]
    fn test_scope_chain_through_environment() {
        let mut heap = heap32();
        let global = heap.namespace(2, &[(0, "print", MockElement::Builtin)], None);
        let local = heap.namespace(2, &[(1, "n", MockElement::Int(3))], Some(global));
        let env = heap.environment(local);

        assert_eq!(
            render(heap, env, "Environment").unwrap().unwrap(),
            "NS{'n': 3}<-NS{'print': builtin(not implemented)}"
        );
    }

    #[test]
    fn test_list_and_function_walks() {
        let mut heap = heap32();
        let list = heap.element(&MockElement::List(vec![
            MockElement::Int(1),
            MockElement::List(vec![MockElement::str("in")]),
            MockElement::Int(i64::MAX),
        ]));
        let func = heap.element(&MockElement::Function {
            params: vec!["a".to_string(), "b".to_string()],
            closure: 0x8000,
        });
        let idents = heap.ident_list(&["p", "q"]);
        let layout = heap.layout().clone();
        let inspector = Inspector::new(heap.build()).with_layout(layout);
        let render = |address, ty| {
            inspector
                .render(&Cell::new(address, TypeRef::new(ty)))
                .unwrap()
                .unwrap()
        };

        assert_eq!(render(list, "Element"), format!("[1 ['in'] {}]", i64::MAX));
        assert_eq!(render(func, "Element"), "fn([Id{'a'} Id{'b'}]) ns=0x8000");
        assert_eq!(render(idents, "IdentList"), "[Id{'p'} Id{'q'}]");
    }

    #[test]
    fn test_snapshot_carries_pointer_size() {
        let mut heap = heap32();
        let ns = heap.namespace(2, &[(1, "k", MockElement::Int(7))], None);
        let reader = heap.build();
        let (base, len) = (reader.base_address(), reader.len());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heap32.json");
        SnapshotFile::capture(&reader, &[(base, len)])
            .unwrap()
            .save(&path)
            .unwrap();

        let snapshot = SnapshotReader::load(&path).unwrap();
        let preset = snapshot
            .pointer_size()
            .map(LayoutPreset::for_pointer_size)
            .unwrap_or_default();
        assert_eq!(preset, LayoutPreset::Ilp32);

        let inspector = Inspector::from_config(snapshot, InspectorConfig::with_preset(preset));
        assert_eq!(
            inspector
                .render(&Cell::new(ns, TypeRef::new("Namespace")))
                .unwrap()
                .as_deref(),
            Some("NS{'k': 7}")
        );
    }
}
