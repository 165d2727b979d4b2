//! Property tests over literal quoting, identity resolution and emission.

use ctm_model::iris::XSD_STRING;
use ctm_model::TopicMap;
use ctm_writer::identity::IdentityResolver;
use ctm_writer::literal::{quote, QuotePath};
use ctm_writer::{CtmWriter, PrefixTable, WriterConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn quote_paths_agree_without_double_quotes(value in "[^\"]{0,24}") {
        prop_assert_eq!(quote(&value, QuotePath::Block), quote(&value, QuotePath::Argument));
    }

    #[test]
    fn block_quotes_never_contain_inner_double_quotes(value in ".{0,24}") {
        let quoted = quote(&value, QuotePath::Block);
        prop_assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        prop_assert!(!quoted[1..quoted.len() - 1].contains('"'));
    }

    #[test]
    fn argument_quotes_keep_double_quotes(prefix in "[a-z]{0,8}", suffix in "[a-z]{1,8}") {
        let value = format!("{prefix}\"{suffix}");
        prop_assert_eq!(
            quote(&value, QuotePath::Argument),
            format!("\"\"\"{value}\"\"\"")
        );
    }

    #[test]
    fn argument_quotes_stay_closed(value in "[a-z\"]{0,16}") {
        let quoted = quote(&value, QuotePath::Argument);
        if value.contains('"') {
            let body = &quoted[3..quoted.len() - 3];
            prop_assert!(!body.ends_with('"') || body.ends_with("\\\""));
            prop_assert!(!body.replace("\\\"", "_").contains("\"\"\""));
        }
    }

    #[test]
    fn identity_resolution_is_idempotent(local in "[A-Za-z_][A-Za-z0-9_]{0,10}", bound in any::<bool>()) {
        let mut tm = TopicMap::new();
        let topic = tm.create_topic_by_subject_identifier(&format!("http://ex.org/{local}"));
        let mut prefixes = PrefixTable::new();
        if bound {
            prefixes.bind("ex", "http://ex.org/").expect("bind");
        }
        let mut resolver = IdentityResolver::new(None, None);
        let first = resolver.resolve(&tm, &prefixes, topic);
        let second = resolver.resolve(&tm, &prefixes, topic);
        let fresh = IdentityResolver::new(None, None).resolve(&tm, &prefixes, topic);
        prop_assert!(first.is_some());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &fresh);
    }

    #[test]
    fn every_name_and_occurrence_is_written_once(
        values in prop::collection::vec("[A-Za-z ]{1,12}", 1..12),
        detect in any::<bool>(),
    ) {
        let mut tm = TopicMap::new();
        let type_ = tm.create_topic_by_subject_identifier("http://ex.org/Thing");
        let note = tm.create_topic_by_subject_identifier("http://ex.org/note");
        let mut expected = Vec::new();
        for (i, value) in values.iter().enumerate() {
            let t = tm.create_topic_by_subject_identifier(&format!("http://ex.org/t{i}"));
            tm.add_type(t, type_);
            let name = format!("n{i} {value}");
            let text = format!("o{i} {value}");
            tm.create_default_name(t, &name, &[]);
            tm.create_occurrence(t, note, &text, XSD_STRING, &[]);
            expected.push(name);
            expected.push(text);
        }
        let config = WriterConfig {
            template_auto_detect: detect,
            ..WriterConfig::default()
        };
        let writer = CtmWriter::new(config).expect("writer");
        let ctm = writer.write_to_string(&tm).expect("write");
        for value in &expected {
            let quoted = format!("\"{value}\"");
            prop_assert_eq!(ctm.matches(&quoted).count(), 1, "{} in\n{}", quoted, ctm);
        }
        prop_assert_eq!(writer.write_to_string(&tm).expect("rewrite"), ctm);
    }
}
