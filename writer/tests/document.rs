//! End-to-end tests: whole documents written from in-memory topic maps.

use ctm_model::iris::{self, XSD_STRING};
use ctm_model::{Reifiable, TopicId, TopicMap, TopicMapSource};
use ctm_writer::template::{Entry, NameEntry, OccurrenceEntry, TopicRef};
use ctm_writer::{CtmError, CtmWriter, Template, WriterConfig};
use pretty_assertions::assert_eq;

fn plain_config() -> WriterConfig {
    WriterConfig {
        prefix_auto_detect: false,
        ..WriterConfig::default()
    }
}

fn ex_writer(config: WriterConfig) -> CtmWriter {
    let mut writer = CtmWriter::new(config).expect("writer");
    writer.add_prefix("ex", "http://ex.org/").expect("prefix");
    writer
}

fn trailer() -> String {
    format!("\n# generated by ctm-writer {}\n", env!("CARGO_PKG_VERSION"))
}

fn si(tm: &mut TopicMap, local: &str) -> TopicId {
    tm.create_topic_by_subject_identifier(&format!("http://ex.org/{local}"))
}

#[test]
fn writes_complete_document_in_stage_order() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let alice = si(&mut tm, "alice");
    tm.add_type(alice, person);
    tm.create_default_name(alice, "Alice", &[]);
    let email = si(&mut tm, "email");
    tm.create_occurrence(alice, email, "alice@ex.org", XSD_STRING, &[]);
    let knows = si(&mut tm, "knows");
    let bob = si(&mut tm, "bob");
    tm.create_default_name(bob, "Bob", &[]);
    let a = tm.create_association(knows, &[]);
    tm.create_role(a, person, alice);
    tm.create_role(a, person, bob);

    let writer = ex_writer(plain_config());
    let mut out = Vec::new();
    let report = writer.write(&tm, &mut out).expect("write");
    let ctm = String::from_utf8(out).expect("utf-8");

    let expected = String::from(
        "%encoding \"UTF-8\"\n\
         %version 1.0\n\
         \n\
         %prefix ex <http://ex.org/>\n\
         %prefix xsd <http://www.w3.org/2001/XMLSchema#>\n\
         \n\
         ex:Person .\n\
         \n\
         ex:alice\n    isa ex:Person;\n    - \"Alice\";\n    ex:email: \"alice@ex.org\" .\n\
         \n\
         ex:email .\n\
         \n\
         ex:knows .\n\
         \n\
         ex:bob\n    - \"Bob\" .\n\
         \n\
         ex:knows(ex:Person : ex:alice, ex:Person : ex:bob)\n",
    ) + &trailer();
    assert_eq!(ctm, expected);

    assert_eq!(report.topics, 5);
    assert_eq!(report.associations, 1);
    assert_eq!(report.invocations, 0);
    assert_eq!(report.prefixes, 2);
    assert_eq!(report.skipped, 0);
}

#[test]
fn unbound_namespace_is_written_absolute() {
    let mut tm = TopicMap::new();
    let x = tm.create_topic_by_subject_identifier("http://ex/x");
    let o = tm.create_topic_by_subject_identifier("http://ex/O");
    tm.create_default_name(x, "Foo", &[]);
    tm.create_occurrence(x, o, "v", XSD_STRING, &[]);

    let writer = CtmWriter::new(plain_config()).expect("writer");
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(
        ctm.contains("<http://ex/x>\n    - \"Foo\";\n    <http://ex/O>: \"v\" .\n"),
        "{ctm}"
    );
}

struct FailingSink;

impl std::io::Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_failure_is_reported_as_io_error() {
    let mut tm = TopicMap::new();
    let alice = si(&mut tm, "alice");
    tm.create_default_name(alice, "Alice", &[]);

    let writer = ex_writer(plain_config());
    let err = writer.write(&tm, &mut FailingSink).expect_err("sink refuses bytes");
    assert!(matches!(err, CtmError::Io(_)), "{err}");
}

#[test]
fn detected_prefixes_compress_identities() {
    let mut tm = TopicMap::new();
    let person = tm.create_topic_by_subject_identifier("http://psi.example.org/people/Person");
    let alice = tm.create_topic_by_subject_identifier("http://psi.example.org/people/alice");
    tm.add_type(alice, person);

    let writer = CtmWriter::new(WriterConfig::default()).expect("writer");
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(ctm.contains("%prefix people <http://psi.example.org/people/>\n"), "{ctm}");
    assert!(ctm.contains("people:alice\n    isa people:Person .\n"), "{ctm}");
    // Every prefix used by a compressed identity is declared.
    for line in ctm.lines().filter(|l| l.contains(':') && !l.starts_with('%') && !l.starts_with('#')) {
        for token in line.split_whitespace() {
            if let Some((label, _)) = token.split_once(':') {
                if !label.is_empty() && !label.starts_with('<') && !label.starts_with('"') {
                    assert!(ctm.contains(&format!("%prefix {label} ")), "undeclared prefix {label} in {line}");
                }
            }
        }
    }
}

#[test]
fn header_carries_reifier_includes_and_merge_maps() {
    let mut tm = TopicMap::new();
    let map = si(&mut tm, "map");
    tm.set_reifier(Reifiable::TopicMap, Some(map));

    let mut writer = ex_writer(plain_config());
    writer.add_include("http://ex.org/base.ctm");
    writer.add_merge_map("http://ex.org/other.xtm", "xtm");
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(
        ctm.starts_with(
            "%encoding \"UTF-8\"\n\
             %version 1.0\n\
             ~ ex:map\n\
             \n\
             %prefix ex <http://ex.org/>\n\
             %prefix xsd <http://www.w3.org/2001/XMLSchema#>\n\
             \n\
             %include <http://ex.org/base.ctm>\n\
             \n\
             %mergemap <http://ex.org/other.xtm> xtm\n\
             \n\
             ex:map .\n"
        ),
        "{ctm}"
    );
}

#[test]
fn typing_associations_fold_into_isa_and_ako() {
    let mut tm = TopicMap::new();
    let agent = si(&mut tm, "Agent");
    let person = si(&mut tm, "Person");
    let alice = si(&mut tm, "alice");
    tm.create_type_instance_association(person, alice);
    tm.create_supertype_subtype_association(agent, person);

    let writer = ex_writer(plain_config());
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(ctm.contains("ex:Person\n    ako ex:Agent .\n"), "{ctm}");
    assert!(ctm.contains("ex:alice\n    isa ex:Person .\n"), "{ctm}");
    assert!(!ctm.contains("type-instance"), "{ctm}");
    assert!(!ctm.contains("supertype-subtype"), "{ctm}");
}

#[test]
fn malformed_typing_association_fails_before_output() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let robot = si(&mut tm, "Robot");
    let alice = si(&mut tm, "alice");
    let assoc_type = tm.create_topic_by_subject_identifier(iris::TYPE_INSTANCE);
    let type_role = tm.create_topic_by_subject_identifier(iris::TYPE);
    let instance_role = tm.create_topic_by_subject_identifier(iris::INSTANCE);
    let a = tm.create_association(assoc_type, &[]);
    tm.create_role(a, type_role, person);
    tm.create_role(a, type_role, robot);
    tm.create_role(a, instance_role, alice);

    let writer = ex_writer(plain_config());
    let mut out = Vec::new();
    let err = writer.write(&tm, &mut out).expect_err("two type roles");
    assert!(
        matches!(err, CtmError::StructuralConstraint { count: 2, .. }),
        "{err}"
    );
    assert!(out.is_empty());
}

#[test]
fn constructs_referencing_anonymous_topics_are_skipped() {
    let mut tm = TopicMap::new();
    let alice = si(&mut tm, "alice");
    let anonymous = tm.create_topic();
    tm.create_occurrence(alice, anonymous, "hidden", XSD_STRING, &[]);
    tm.create_default_name(alice, "Alice", &[]);

    let writer = ex_writer(plain_config());
    let mut out = Vec::new();
    let report = writer.write(&tm, &mut out).expect("write");
    let ctm = String::from_utf8(out).expect("utf-8");
    assert!(ctm.contains("ex:alice\n    - \"Alice\" .\n"), "{ctm}");
    assert!(!ctm.contains("hidden"));
    // The anonymous topic's own block and the occurrence typed by it.
    assert_eq!(report.skipped, 2);
}

fn people(tm: &mut TopicMap) -> (TopicId, TopicId, TopicId) {
    let person = si(tm, "Person");
    let email = si(tm, "email");
    let homepage = si(tm, "homepage");
    for (local, name, mail, page) in [
        ("alice", "Alice", "alice@ex.org", Some("http://alice.org/")),
        ("bob", "Bob", "bob@ex.org", Some("http://bob.org/")),
        ("carol", "Carol", "carol@ex.org", None),
    ] {
        let t = si(tm, local);
        tm.add_type(t, person);
        tm.create_default_name(t, name, &[]);
        tm.create_occurrence(t, email, mail, XSD_STRING, &[]);
        if let Some(page) = page {
            tm.create_occurrence(t, homepage, page, iris::XSD_ANY_URI, &[]);
        }
    }
    (person, email, homepage)
}

fn detecting(threshold: f64) -> WriterConfig {
    WriterConfig {
        prefix_auto_detect: false,
        template_auto_detect: true,
        template_relevance_threshold: threshold,
        ..WriterConfig::default()
    }
}

fn definition(ctm: &str, name: &str) -> String {
    let start = ctm
        .find(&format!("def {name}("))
        .unwrap_or_else(|| panic!("no definition of {name} in {ctm}"));
    let end = ctm[start..].find("end\n").map_or(ctm.len(), |e| start + e + 4);
    ctm[start..end].to_owned()
}

#[test]
fn relevance_threshold_decides_template_entries() {
    let mut tm = TopicMap::new();
    people(&mut tm);

    let low = ex_writer(detecting(0.66)).write_to_string(&tm).expect("write");
    let def = definition(&low, "Person-template");
    assert!(def.contains("ex:homepage: $homepage"), "{def}");

    let high = ex_writer(detecting(0.7)).write_to_string(&tm).expect("write");
    let def = definition(&high, "Person-template");
    assert!(!def.contains("homepage"), "{def}");
    assert!(def.contains("ex:email: $email"), "{def}");
}

#[test]
fn every_value_is_written_exactly_once() {
    let mut tm = TopicMap::new();
    people(&mut tm);
    let values = [
        "\"Alice\"",
        "\"Bob\"",
        "\"Carol\"",
        "\"alice@ex.org\"",
        "\"bob@ex.org\"",
        "\"carol@ex.org\"",
        "<http://alice.org/>",
        "<http://bob.org/>",
    ];
    for config in [plain_config(), detecting(0.66), detecting(0.7)] {
        let ctm = ex_writer(config).write_to_string(&tm).expect("write");
        for value in values {
            assert_eq!(ctm.matches(value).count(), 1, "{value} in\n{ctm}");
        }
    }
}

fn name_type(tm: &mut TopicMap) -> TopicId {
    tm.create_topic_by_subject_identifier(iris::TOPIC_NAME)
}

fn person_template(person: TopicId, name_type: TopicId) -> Template {
    Template::topic(
        "person-template",
        vec![
            Entry::IsInstanceOf(TopicRef::Topic(person)),
            Entry::Name(NameEntry {
                type_: TopicRef::Topic(name_type),
                value: "$name".to_owned(),
                scope: None,
                reifier: None,
                variants: Vec::new(),
            }),
        ],
    )
}

#[test]
fn explicit_template_is_defined_and_invoked() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let alice = si(&mut tm, "alice");
    tm.add_type(alice, person);
    tm.create_default_name(alice, "Alice", &[]);
    let nt = name_type(&mut tm);

    let mut writer = ex_writer(plain_config());
    writer.add_template(person_template(person, nt)).expect("template");
    let mut out = Vec::new();
    let report = writer.write(&tm, &mut out).expect("write");
    let ctm = String::from_utf8(out).expect("utf-8");

    assert_eq!(
        definition(&ctm, "person-template"),
        "def person-template($topic, $name)\n    $topic\n        isa ex:Person;\n        - $name .\nend\n"
    );
    assert!(ctm.contains("ex:alice\n    person-template(\"Alice\") .\n"), "{ctm}");
    assert_eq!(report.templates_defined, 1);
    assert_eq!(report.invocations, 1);
}

#[test]
fn unrenderable_template_fails_before_output() {
    let mut tm = TopicMap::new();
    let anonymous = tm.create_topic();
    let alice = si(&mut tm, "alice");
    tm.create_default_name(alice, "Alice", &[]);

    let mut writer = ex_writer(plain_config());
    writer
        .add_template(Template::topic(
            "typed-by-nobody",
            vec![Entry::IsInstanceOf(TopicRef::Topic(anonymous))],
        ))
        .expect("template");
    let mut out = Vec::new();
    let err = writer.write(&tm, &mut out).expect_err("type has no identity");
    assert!(matches!(err, CtmError::InvalidTemplate { .. }), "{err}");
    assert!(out.is_empty());
}

#[test]
fn template_without_statements_is_refused() {
    let mut writer = ex_writer(plain_config());
    let err = writer
        .add_template(Template::topic("empty", Vec::new()))
        .expect_err("nothing to match");
    assert!(matches!(err, CtmError::InvalidTemplate { .. }), "{err}");
}

#[test]
fn excluded_template_is_invoked_but_not_defined() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let alice = si(&mut tm, "alice");
    tm.add_type(alice, person);
    tm.create_default_name(alice, "Alice", &[]);
    let nt = name_type(&mut tm);

    let config = WriterConfig {
        template_export_exclude: vec!["person-template".to_owned()],
        ..plain_config()
    };
    let mut writer = ex_writer(config);
    writer.add_template(person_template(person, nt)).expect("template");
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(!ctm.contains("def person-template"), "{ctm}");
    assert!(ctm.contains("person-template(\"Alice\")"), "{ctm}");
}

#[test]
fn quotes_diverge_between_blocks_and_arguments() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let alice = si(&mut tm, "alice");
    tm.add_type(alice, person);
    tm.create_default_name(alice, "Ä \"x\" B", &[]);
    let bob = si(&mut tm, "bob");
    tm.create_default_name(bob, "Ä \"x\" B", &[]);
    let nt = name_type(&mut tm);

    let mut writer = ex_writer(plain_config());
    writer.add_template(person_template(person, nt)).expect("template");
    let ctm = writer.write_to_string(&tm).expect("write");
    assert!(ctm.contains("ex:alice\n    person-template(\"\"\"Ä \"x\" B\"\"\") .\n"), "{ctm}");
    assert!(ctm.contains("ex:bob\n    - \"Ä 'x' B\" .\n"), "{ctm}");
}

#[test]
fn disjoint_templates_are_not_merged() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let place = si(&mut tm, "Place");
    let lat = si(&mut tm, "lat");
    let nt = name_type(&mut tm);

    let config = WriterConfig {
        template_merge: true,
        ..plain_config()
    };
    let mut writer = ex_writer(config);
    writer.add_template(person_template(person, nt)).expect("person");
    writer
        .add_template(Template::topic(
            "place-template",
            vec![
                Entry::IsInstanceOf(TopicRef::Topic(place)),
                Entry::Occurrence(OccurrenceEntry {
                    type_: TopicRef::Topic(lat),
                    value: "$lat".to_owned(),
                    datatype: iris::XSD_DECIMAL.to_owned(),
                    scope: None,
                    reifier: None,
                }),
            ],
        ))
        .expect("place");
    let mut out = Vec::new();
    let report = writer.write(&tm, &mut out).expect("write");
    let ctm = String::from_utf8(out).expect("utf-8");
    assert_eq!(report.templates_defined, 2);
    assert!(!ctm.contains("merged-"), "{ctm}");
    assert!(!ctm.contains("-invoc-"), "{ctm}");
}

#[test]
fn shared_entries_are_factored_into_invoked_sub_templates() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "Person");
    let robot = si(&mut tm, "Robot");
    let email = si(&mut tm, "email");
    let nt = name_type(&mut tm);
    let alice = si(&mut tm, "alice");
    tm.add_type(alice, person);
    tm.create_default_name(alice, "Alice", &[]);
    tm.create_occurrence(alice, email, "alice@ex.org", XSD_STRING, &[]);

    let shared = |type_: TopicId| {
        vec![
            Entry::IsInstanceOf(TopicRef::Topic(type_)),
            Entry::Name(NameEntry {
                type_: TopicRef::Topic(nt),
                value: "$name".to_owned(),
                scope: None,
                reifier: None,
                variants: Vec::new(),
            }),
            Entry::Occurrence(OccurrenceEntry {
                type_: TopicRef::Topic(email),
                value: "$email".to_owned(),
                datatype: XSD_STRING.to_owned(),
                scope: None,
                reifier: None,
            }),
        ]
    };
    let config = WriterConfig {
        template_merge: true,
        ..plain_config()
    };
    let mut writer = ex_writer(config);
    writer.add_template(Template::topic("person", shared(person))).expect("person");
    writer.add_template(Template::topic("robot", shared(robot))).expect("robot");
    let ctm = writer.write_to_string(&tm).expect("write");

    // Sub-templates are defined before the templates invoking them.
    let sub = ctm.find("def person-invoc-1(").expect("sub-template");
    let parent = ctm.find("def person(").expect("parent");
    assert!(sub < parent, "{ctm}");
    assert!(definition(&ctm, "person").contains("person-invoc-1($name, $email)"), "{ctm}");
    assert!(ctm.contains("def merged-3("), "{ctm}");
    // Values are still written once.
    assert_eq!(ctm.matches("\"Alice\"").count(), 1, "{ctm}");
    assert_eq!(ctm.matches("\"alice@ex.org\"").count(), 1, "{ctm}");
    assert!(!ctm.contains("isa ex:Person;\n    - \"Alice\""), "{ctm}");
}

#[test]
fn association_templates_replace_association_lines() {
    let mut tm = TopicMap::new();
    let person = si(&mut tm, "person");
    let knows = si(&mut tm, "knows");
    let names = ["alice", "bob", "carol"];
    let topics: Vec<TopicId> = names.iter().map(|n| si(&mut tm, n)).collect();
    for pair in topics.windows(2) {
        let a = tm.create_association(knows, &[]);
        tm.create_role(a, person, pair[0]);
        tm.create_role(a, person, pair[1]);
    }

    let config = WriterConfig {
        template_detect_topics: false,
        ..detecting(0.8)
    };
    let mut out = Vec::new();
    let report = ex_writer(config).write(&tm, &mut out).expect("write");
    let ctm = String::from_utf8(out).expect("utf-8");
    assert!(
        ctm.contains("def knows-template($person, $person1)\n    ex:knows(ex:person : $person, ex:person : $person1)\nend\n"),
        "{ctm}"
    );
    assert!(ctm.contains("knows-template(ex:alice, ex:bob)\nknows-template(ex:bob, ex:carol)\n"), "{ctm}");
    assert_eq!(report.associations, 2);
    assert_eq!(report.invocations, 2);
    assert!(!ctm.contains("ex:knows(ex:person : ex:alice"), "{ctm}");
    assert_eq!(tm.association_ids().len(), 2);
}
