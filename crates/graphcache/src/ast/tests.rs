use indoc::indoc;
use serde_json::json;

use super::*;

fn variables(value: serde_json::Value) -> Variables {
    match value {
        serde_json::Value::Object(object) => object,
        _ => unreachable!(),
    }
}

#[test]
fn prints_documents() {
    let document = Document::parse(indoc! {r#"
        query Todos($first: Int = 10, $done: Boolean) {
          todos(first: $first, filter: {done: $done, text: "shops"}) @include(if: $done) {
            id
            ... on Todo { text }
            ...TodoFields
          }
        }

        fragment TodoFields on Todo {
          complete
          author: writer { name }
        }
    "#})
    .unwrap();

    insta::assert_snapshot!(document.to_string(), @r#"
    query Todos($first: Int = 10, $done: Boolean) {
      todos(first: $first, filter: {done: $done, text: "shops"}) @include(if: $done) {
        id
        ... on Todo {
          text
        }
        ...TodoFields
      }
    }

    fragment TodoFields on Todo {
      complete
      author: writer {
        name
      }
    }
    "#);
}

#[test]
fn adds_typenames() {
    let document = Document::parse(indoc! {r"
        query {
          todos {
            id
            author { name __typename }
            ... on Todo { tags { label } }
          }
          count
        }

        fragment AuthorFields on Author {
          name
        }
    "})
    .unwrap()
    .with_typenames()
    .unwrap();

    insta::assert_snapshot!(document.to_string(), @r"
    query {
      todos {
        id
        author {
          name
          __typename
        }
        ... on Todo {
          tags {
            label
            __typename
          }
          __typename
        }
        __typename
      }
      count
    }

    fragment AuthorFields on Author {
      name
      __typename
    }
    ");
}

#[test]
fn equal_documents_hash_equally() {
    let first = Document::parse("{ todos { id } }").unwrap();
    let second = Document::parse("query {\n  todos {\n    id\n  }\n}").unwrap();
    let third = Document::parse("{ todos { text } }").unwrap();

    assert_eq!(first.hash(), second.hash());
    assert_ne!(first.hash(), third.hash());
}

#[test]
fn document_errors() {
    assert!(matches!(Document::parse("{ todos { id }"), Err(DocumentError::Parse(_))));

    let fragments_only = Document::parse("fragment A on Todo { id }").unwrap();
    assert_eq!(fragments_only.main_operation().unwrap_err(), DocumentError::NoOperation);
    assert_eq!(
        fragments_only.select_fragment(Some("B")).unwrap_err(),
        DocumentError::UnknownFragment("B".into())
    );
    assert_eq!(fragments_only.select_fragment(None).unwrap().name, "A");
}

#[test]
fn applies_variable_defaults() {
    let document = Document::parse("query ($first: Int = 10, $after: String, $filter: String) { todos { id } }").unwrap();

    let normalized = normalize_variables(document.operation(), &variables(json!({"filter": "x", "other": 1})));

    assert_eq!(normalized, variables(json!({"first": 10, "filter": "x"})));
}

#[test]
fn drops_unset_variables_from_arguments() {
    let document = Document::parse("{ todos(first: $first, after: $after, done: true) { id } }").unwrap();
    let Selection::Field(field) = &document.main_operation().unwrap().selection_set[0] else {
        unreachable!()
    };

    let arguments = resolve_arguments(&field.arguments, &variables(json!({"first": 2})));
    assert_eq!(arguments, Some(variables(json!({"first": 2, "done": true}))));

    let document = Document::parse("{ todos(after: $after) { id } }").unwrap();
    let Selection::Field(field) = &document.main_operation().unwrap().selection_set[0] else {
        unreachable!()
    };
    assert_eq!(resolve_arguments(&field.arguments, &Variables::new()), None);
}

#[test]
fn evaluates_skip_and_include() {
    let document = Document::parse(indoc! {r"
        query {
          a @include(if: $yes)
          b @include(if: $no)
          c @include(if: $unset)
          d @skip(if: $yes)
          e @skip(if: $unset)
          f @skip(if: false) @include(if: true)
        }
    "})
    .unwrap();
    let variables = variables(json!({"yes": true, "no": false}));

    let included = document
        .main_operation()
        .unwrap()
        .selection_set
        .iter()
        .filter_map(|selection| match selection {
            Selection::Field(field) if should_include(&field.directives, &variables) => Some(field.name.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(included, vec!["a", "e", "f"]);
}
