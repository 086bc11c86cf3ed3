use proptest::prelude::*;
use wmelon_prebuild::anchor::{closest_line, patch, plan_insertion, Placement};

#[test]
fn test_import_scenario() {
    assert_eq!(
        patch(
            "import X;",
            "import java.util.List;",
            "import java.util.List;\nclass Foo {}"
        ),
        "import X;\nimport java.util.List;\nclass Foo {}"
    );
}

#[test]
fn test_insert_containing_anchor_duplicates_on_reapply() {
    let anchor = "import java.util.List;";
    let insert = "import java.util.List; // again";
    let document = "package a;\nimport java.util.List;\n";

    let once = patch(insert, anchor, document);
    let twice = patch(insert, anchor, &once);
    assert_eq!(twice.matches(insert).count(), 2);
    assert_ne!(once, twice);
}

proptest! {
    #[test]
    fn prop_present_anchor_inserts_before_first_occurrence(
        prefix in "[a-z \n]{0,40}",
        anchor in "[A-Z]{1,8}",
        suffix in "[a-zA-Z \n]{0,40}",
        insert in "[a-z0-9;]{0,20}",
    ) {
        let document = format!("{prefix}{anchor}{suffix}");
        let out = patch(&insert, &anchor, &document);

        prop_assert_eq!(&out[..prefix.len()], prefix.as_str());
        prop_assert_eq!(&out[prefix.len()..prefix.len() + insert.len() + 1], format!("{insert}\n"));
        prop_assert_eq!(&out[prefix.len() + insert.len() + 1..], &document[prefix.len()..]);
    }

    #[test]
    fn prop_absent_anchor_is_noop(
        document in "[a-z \n]{0,60}",
        anchor in "[A-Z]{1,8}",
        insert in "[a-z]{0,20}",
    ) {
        prop_assert_eq!(patch(&insert, &anchor, &document), document);
    }

    #[test]
    fn prop_insert_containing_anchor_is_not_idempotent(
        prefix in "[a-z \n]{0,40}",
        anchor in "[A-Z]{1,8}",
        suffix in "[a-z \n]{0,40}",
    ) {
        let insert = format!("{anchor};");
        let document = format!("{prefix}{anchor}{suffix}");

        let twice = patch(&insert, &anchor, &patch(&insert, &anchor, &document));
        prop_assert_eq!(twice, format!("{prefix}{insert}\n{insert}\n{anchor}{suffix}"));
    }

    #[test]
    fn prop_after_placement_starts_next_line(
        before in prop::collection::vec("[a-z ]{0,12}", 0..4),
        anchor in "[A-Z]{1,8}",
        after in prop::collection::vec("[a-z ]{0,12}", 0..4),
        insert in "[a-z]{1,12}",
    ) {
        let mut lines = before.clone();
        lines.push(anchor.clone());
        lines.extend(after.iter().cloned());
        let document = lines.join("\n") + "\n";

        let insertion = plan_insertion(&insert, &anchor, &document, Placement::After).unwrap();
        let out = insertion.apply_to(&document);
        let out_lines: Vec<&str> = out.lines().collect();

        prop_assert_eq!(out_lines[before.len()], anchor.as_str());
        prop_assert_eq!(out_lines[before.len() + 1], insert.as_str());
        prop_assert_eq!(out_lines.len(), lines.len() + 1);
    }

    #[test]
    fn prop_exact_line_is_its_own_suggestion(
        lines in prop::collection::vec("[a-z ]{0,16}", 0..6),
        anchor in "[A-Z][A-Z ]{0,10}[A-Z]",
    ) {
        let mut all = lines;
        all.push(anchor.clone());
        let document = all.join("\n");
        prop_assert_eq!(closest_line(&document, &anchor), Some(anchor));
    }
}
