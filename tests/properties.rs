use docmap::docstring::remove_indents;
use docmap::{build_graves, GraveType, GravedSpan, QualPath};
use proptest::prelude::*;

fn dotted() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,8}", 1..6).prop_map(|parts| parts.join("."))
}

fn plain() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,.()]{0,12}"
}

proptest! {
    #[test]
    fn qualpath_parts_round_trip(path in dotted()) {
        let parsed = QualPath::parse(&path).unwrap();
        let joined = parsed.parts().collect::<Vec<_>>().join(".");
        prop_assert_eq!(joined, path.clone());
        prop_assert_eq!(parsed.to_string(), path);
    }

    #[test]
    fn qualpath_join_concatenates_parts(a in dotted(), b in dotted()) {
        let a = QualPath::parse(&a).unwrap();
        let b = QualPath::parse(&b).unwrap();
        let joined = &a / &b;
        let expected: Vec<&str> = a.parts().chain(b.parts()).collect();
        prop_assert_eq!(joined.parts().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn qualpath_sub_removes_right_suffix(a in dotted(), b in dotted()) {
        let a = QualPath::parse(&a).unwrap();
        let b = QualPath::parse(&b).unwrap();
        prop_assert_eq!(&(&a / &b) - &b, a);
    }

    #[test]
    fn double_graves_are_global_references(
        pieces in prop::collection::vec((plain(), "[A-Za-z_][A-Za-z0-9_.]{0,10}"), 1..5),
        tail in plain(),
    ) {
        let mut text = String::new();
        for (before, reference) in &pieces {
            text.push_str(before);
            text.push_str("``");
            text.push_str(reference);
            text.push_str("``");
        }
        text.push_str(&tail);

        let (spans, warnings) = build_graves(&text);
        prop_assert!(warnings.is_empty());
        let references: Vec<&str> = spans
            .iter()
            .filter_map(GravedSpan::as_grave)
            .filter(|grave| grave.kind == GraveType::GlobalReference)
            .map(|grave| grave.content.as_str())
            .collect();
        let expected: Vec<&str> = pieces.iter().map(|(_, reference)| reference.as_str()).collect();
        prop_assert_eq!(references, expected);
    }

    #[test]
    fn unterminated_grave_warns(before in plain(), after in plain()) {
        let text = format!("{before}`{after}");
        let (_, warnings) = build_graves(&text);
        prop_assert!(!warnings.is_empty());
    }

    #[test]
    fn remove_indents_is_idempotent(
        lines in prop::collection::vec("( {0,6}|\t)[a-z .]{0,10}", 0..8),
    ) {
        if let Some(once) = remove_indents(&lines) {
            let twice = remove_indents(&once);
            prop_assert_eq!(twice, Some(once));
        }
    }
}

#[test]
fn qualpath_sub_scenario() {
    let a = QualPath::parse("a.b.c").unwrap();
    let b = QualPath::parse("b.c").unwrap();
    assert_eq!(a - b, QualPath::parse("a").unwrap());
}
