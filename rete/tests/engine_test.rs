extern crate rete;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rete::{
    parse_rules, EngineConfig, EngineState, ForwardInfGraph, MemoryInfGraph, ReteEngine, ReteError,
};
use shared::dictionary::Dictionary;
use shared::graph::{GraphError, TripleSource};
use shared::index_manager::UnifiedIndex;
use shared::rule::Rule;
use shared::terms::{Term, TriplePattern};
use shared::triple::Triple;

#[cfg(test)]
mod tests {
    use super::*;

    const WORKS_IN: &str = "[worksIn: (?x type Employee) (?x dept ?d) -> (?x worksIn ?d)]";
    const ANCESTOR: &str = "[trans: (?a ancestor ?b) (?b ancestor ?c) -> (?a ancestor ?c)]";

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn setup_engine(rules: &str, config: EngineConfig) -> (Dictionary, ReteEngine<MemoryInfGraph>) {
        init_logger();
        let mut dict = Dictionary::new();
        let rules = parse_rules(rules, &mut dict).unwrap();
        let engine = ReteEngine::new(MemoryInfGraph::new(), rules, config);
        (dict, engine)
    }

    fn insert(
        engine: &mut ReteEngine<MemoryInfGraph>,
        dict: &mut Dictionary,
        s: &str,
        p: &str,
        o: &str,
    ) -> Triple {
        let t = dict.encode_triple(s, p, o);
        engine.add(t).unwrap();
        t
    }

    fn deductions(engine: &ReteEngine<MemoryInfGraph>) -> Vec<Triple> {
        engine.graph().deductions().query(None, None, None)
    }

    fn decoded(dict: &Dictionary, triples: &[Triple]) -> Vec<String> {
        let mut out: Vec<String> = triples.iter().map(|t| dict.decode_triple(t)).collect();
        out.sort();
        out
    }

    #[test]
    fn test_join_completes_on_second_fact() {
        let (mut dict, mut engine) = setup_engine(WORKS_IN, EngineConfig::default());
        engine.init(true).unwrap();

        insert(&mut engine, &mut dict, "alice", "type", "Employee");
        assert!(deductions(&engine).is_empty());
        assert_eq!(engine.n_rules_fired(), 0);

        insert(&mut engine, &mut dict, "alice", "dept", "eng");
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["alice worksIn eng ."]);
        assert_eq!(engine.n_rules_fired(), 1);
    }

    #[test]
    fn test_join_order_does_not_matter() {
        let (mut dict, mut engine) = setup_engine(WORKS_IN, EngineConfig::default());
        engine.init(true).unwrap();

        insert(&mut engine, &mut dict, "bob", "dept", "ops");
        insert(&mut engine, &mut dict, "carol", "dept", "eng");
        insert(&mut engine, &mut dict, "bob", "type", "Employee");
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["bob worksIn ops ."]);
    }

    #[test]
    fn test_axioms_asserted_at_init() {
        let rules = format!("{}\n[version: -> (schema version \"1\")]", WORKS_IN);
        let (mut dict, mut engine) = setup_engine(&rules, EngineConfig::default());
        engine.init(true).unwrap();

        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["schema version \"1\" ."]);
        assert_eq!(engine.n_axiom_rules_fired(), Some(1));
        assert_eq!(engine.n_rules_fired(), 1);

        insert(&mut engine, &mut dict, "alice", "type", "Employee");
        insert(&mut engine, &mut dict, "alice", "dept", "eng");
        assert_eq!(engine.n_rules_fired() - engine.n_axiom_rules_fired().unwrap(), 1);
    }

    #[test]
    fn test_axiom_processing_is_idempotent() {
        let rules = "[a1: -> (schema version \"1\")] [a2: -> (schema owner lab)]
                     [own: (schema owner ?o) -> (?o maintains schema)]";
        let (dict, mut engine) = setup_engine(rules, EngineConfig::default());
        engine.init(true).unwrap();
        let first = deductions(&engine);
        assert_eq!(first.len(), 3);
        let axiom_count = engine.n_axiom_rules_fired();

        engine.init(true).unwrap();
        assert_eq!(deductions(&engine), first);
        assert_eq!(engine.n_axiom_rules_fired(), axiom_count);
        assert!(decoded(&dict, &first).contains(&"lab maintains schema .".to_string()));
    }

    #[test]
    fn test_wildcard_rule_sees_every_predicate() {
        let rule = "[seen: (?s ?p ?o) -> (?s seen yes)]";
        let (mut dict, mut engine) = setup_engine(rule, EngineConfig::default());
        let existing = dict.encode_triple("x", "anything", "y");
        engine.graph_mut().add_raw(&existing).unwrap();
        engine.init(true).unwrap();

        let store = engine.rule_store().unwrap();
        assert!(store.is_wildcard_rule());
        assert!(store.predicates_used().is_none());
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["x seen yes ."]);

        insert(&mut engine, &mut dict, "a", "neverMentioned", "b");
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["a seen yes .", "x seen yes ."]);
    }

    #[test]
    fn test_same_triple_fires_rule_once() {
        let rule = "[loop: (?x p ?y) (?y p ?x) -> (?x q ?y)]";
        let (mut dict, mut engine) = setup_engine(rule, EngineConfig::default());
        engine.init(true).unwrap();

        // (a p a) satisfies both clauses on its own.
        insert(&mut engine, &mut dict, "a", "p", "a");
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["a q a ."]);
        assert_eq!(engine.n_rules_fired(), 1);
    }

    #[test]
    fn test_transitive_closure() {
        let (mut dict, mut engine) = setup_engine(ANCESTOR, EngineConfig::default());
        engine.init(true).unwrap();

        insert(&mut engine, &mut dict, "c", "ancestor", "d");
        insert(&mut engine, &mut dict, "a", "ancestor", "b");
        insert(&mut engine, &mut dict, "b", "ancestor", "c");

        assert_eq!(
            decoded(&dict, &deductions(&engine)),
            vec!["a ancestor c .", "a ancestor d .", "b ancestor d ."]
        );
        let all = engine.graph().find(None, dict.lookup("ancestor"), None).unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_cycle_terminates() {
        let (mut dict, mut engine) = setup_engine(ANCESTOR, EngineConfig::default());
        engine.init(true).unwrap();

        insert(&mut engine, &mut dict, "a", "ancestor", "b");
        insert(&mut engine, &mut dict, "b", "ancestor", "a");
        assert_eq!(
            decoded(&dict, &deductions(&engine)),
            vec!["a ancestor a .", "b ancestor b ."]
        );
    }

    #[test]
    fn test_bootstrap_closure_over_raw_graph() {
        let (mut dict, mut engine) = setup_engine(ANCESTOR, EngineConfig::default());
        for (s, o) in [("a", "b"), ("b", "c"), ("c", "d")] {
            let t = dict.encode_triple(s, "ancestor", o);
            engine.graph_mut().add_raw(&t).unwrap();
        }
        engine.init(true).unwrap();
        assert_eq!(deductions(&engine).len(), 3);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let run = || {
            let rules = format!("{}\n{}", WORKS_IN, ANCESTOR);
            let (mut dict, mut engine) = setup_engine(&rules, EngineConfig::default());
            engine.init(true).unwrap();
            for (s, p, o) in [
                ("a", "ancestor", "b"),
                ("alice", "dept", "eng"),
                ("b", "ancestor", "c"),
                ("alice", "type", "Employee"),
                ("c", "ancestor", "a"),
            ] {
                insert(&mut engine, &mut dict, s, p, o);
            }
            (decoded(&dict, &deductions(&engine)), engine.n_rules_fired())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_delete_does_not_cascade() {
        let (mut dict, mut engine) = setup_engine(WORKS_IN, EngineConfig::default());
        engine.init(true).unwrap();
        let premise = insert(&mut engine, &mut dict, "alice", "type", "Employee");
        insert(&mut engine, &mut dict, "alice", "dept", "eng");

        engine.graph_mut().remove_raw(&premise);
        engine.delete(premise).unwrap();
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["alice worksIn eng ."]);

        let derived = dict.encode_triple("alice", "worksIn", "eng");
        engine.delete(derived).unwrap();
        assert!(deductions(&engine).is_empty());
    }

    #[test]
    fn test_shared_rule_store() {
        let rules = format!("{}\n[version: -> (schema version \"1\")]", WORKS_IN);
        let (mut dict, mut first) = setup_engine(&rules, EngineConfig::default());
        first.init(true).unwrap();
        let store = first.rule_store().unwrap();

        let mut raw = MemoryInfGraph::new();
        raw.add_raw(&dict.encode_triple("dan", "type", "Employee")).unwrap();
        raw.add_raw(&dict.encode_triple("dan", "dept", "hr")).unwrap();
        let mut second =
            ReteEngine::with_rule_store(raw, Arc::clone(&store), EngineConfig::default());
        second.init(true).unwrap();
        assert!(Arc::ptr_eq(&store, &second.rule_store().unwrap()));
        assert_eq!(
            decoded(&dict, &second.graph().deductions().query(None, None, None)),
            vec!["dan worksIn hr .", "schema version \"1\" ."]
        );

        // fast_init skips the axioms.
        let mut raw = MemoryInfGraph::new();
        raw.add_raw(&dict.encode_triple("eve", "type", "Employee")).unwrap();
        raw.add_raw(&dict.encode_triple("eve", "dept", "hr")).unwrap();
        let mut third = ReteEngine::new(raw, Vec::new(), EngineConfig::default());
        third.set_rule_store(store);
        third.fast_init().unwrap();
        assert_eq!(
            decoded(&dict, &third.graph().deductions().query(None, None, None)),
            vec!["eve worksIn hr ."]
        );
        assert_eq!(third.n_axiom_rules_fired(), None);
    }

    #[test]
    fn test_derivation_records() {
        let config = EngineConfig { record_derivations: true, ..EngineConfig::default() };
        let (mut dict, mut engine) = setup_engine(WORKS_IN, config);
        engine.init(true).unwrap();
        insert(&mut engine, &mut dict, "alice", "type", "Employee");
        let trigger = insert(&mut engine, &mut dict, "alice", "dept", "eng");

        let conclusion = dict.encode_triple("alice", "worksIn", "eng");
        let found = engine.derivations_for(&conclusion);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule_name, "worksIn");
        assert_eq!(found[0].trigger, Some(trigger));
        assert_eq!(found[0].bindings, vec![dict.lookup("alice"), dict.lookup("eng")]);

        engine.set_derivation_logging(false);
        insert(&mut engine, &mut dict, "bob", "type", "Employee");
        insert(&mut engine, &mut dict, "bob", "dept", "ops");
        assert_eq!(engine.derivations().len(), 1);
        assert_eq!(deductions(&engine).len(), 2);
    }

    #[test]
    fn test_backward_rules() {
        let rules = "[(?b parent ?a) <- (?a child ?b)]";
        let (mut dict, mut engine) = setup_engine(rules, EngineConfig::default());
        engine.init_default().unwrap();
        insert(&mut engine, &mut dict, "x", "child", "y");
        assert!(deductions(&engine).is_empty());

        let (mut dict, mut engine) = setup_engine(rules, EngineConfig::default());
        engine.init(false).unwrap();
        insert(&mut engine, &mut dict, "x", "child", "y");
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["y parent x ."]);
    }

    #[test]
    fn test_unbound_head_variable_fails_init() {
        let rule = "[bad: (?x p ?y) -> (?x q ?z)]";
        let (_, mut engine) = setup_engine(rule, EngineConfig::default());
        let err = engine.init(true).unwrap_err();
        assert!(matches!(err, ReteError::UnboundHeadVariable { index: 2, .. }));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_trace_does_not_change_results() {
        let config = EngineConfig { trace: true, ..EngineConfig::default() };
        let (mut dict, mut engine) = setup_engine(WORKS_IN, config);
        engine.init(true).unwrap();
        insert(&mut engine, &mut dict, "alice", "type", "Employee");
        insert(&mut engine, &mut dict, "alice", "dept", "eng");
        assert_eq!(deductions(&engine).len(), 1);
    }

    #[test]
    fn test_add_stores_the_fact_itself() {
        let (mut dict, mut engine) = setup_engine(WORKS_IN, EngineConfig::default());
        engine.init(true).unwrap();

        let employee = dict.encode_triple("alice", "type", "Employee");
        engine.add(employee).unwrap();
        engine.add(dict.encode_triple("alice", "dept", "eng")).unwrap();

        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["alice worksIn eng ."]);
        assert_eq!(engine.n_rules_fired(), 1);
        let raw = engine.graph().raw().unwrap();
        assert!(raw.contains(&employee));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_add_on_deductions_only_graph() {
        init_logger();
        let mut dict = Dictionary::new();
        let rules = parse_rules(ANCESTOR, &mut dict).unwrap();
        let graph = MemoryInfGraph::without_raw();
        let mut engine = ReteEngine::new(graph, rules, EngineConfig::default());
        engine.init(true).unwrap();

        engine.add(dict.encode_triple("a", "ancestor", "b")).unwrap();
        engine.add(dict.encode_triple("b", "ancestor", "c")).unwrap();
        assert_eq!(decoded(&dict, &deductions(&engine)), vec!["a ancestor c ."]);
    }

    #[test]
    fn test_three_clause_join_in_every_order() {
        let rule = "[basedIn: (?x memberOf ?t) (?t partOf ?d) (?d locatedIn ?c)
                    -> (?x basedIn ?c)]";
        let facts = [
            ("alice", "memberOf", "t1"),
            ("t1", "partOf", "eng"),
            ("eng", "locatedIn", "gent"),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in orders {
            let (mut dict, mut engine) = setup_engine(rule, EngineConfig::default());
            engine.init(true).unwrap();
            // Never completes: t2 is not part of anything.
            insert(&mut engine, &mut dict, "bob", "memberOf", "t2");
            for i in order {
                let (s, p, o) = facts[i];
                insert(&mut engine, &mut dict, s, p, o);
            }
            assert_eq!(
                decoded(&dict, &deductions(&engine)),
                vec!["alice basedIn gent ."],
                "arrival order {:?}",
                order
            );
            assert_eq!(engine.n_rules_fired(), 1);
        }
    }

    #[test]
    fn test_three_clause_cycle_join() {
        let rule = "[triangle: (?a knows ?b) (?b knows ?c) (?c knows ?a) -> (?a inTriangle ?c)]";
        let (mut dict, mut engine) = setup_engine(rule, EngineConfig::default());
        engine.init(true).unwrap();

        insert(&mut engine, &mut dict, "x", "knows", "y");
        insert(&mut engine, &mut dict, "z", "knows", "x");
        insert(&mut engine, &mut dict, "y", "knows", "w");
        assert!(deductions(&engine).is_empty());

        insert(&mut engine, &mut dict, "y", "knows", "z");
        assert_eq!(
            decoded(&dict, &deductions(&engine)),
            vec!["x inTriangle z .", "y inTriangle x .", "z inTriangle y ."]
        );
    }

    #[test]
    fn test_join_on_variable_predicate() {
        let rule = "[notify: (?s ?p flagged) (?s owner ?o) -> (?o notifiedAbout ?p)]";
        for owner_first in [false, true] {
            let (mut dict, mut engine) = setup_engine(rule, EngineConfig::default());
            engine.init(true).unwrap();
            let mut facts = vec![
                ("doc1", "status", "flagged"),
                ("doc2", "review", "flagged"),
                ("doc1", "owner", "alice"),
                ("doc2", "owner", "bob"),
                ("doc3", "owner", "carol"),
            ];
            if owner_first {
                facts.reverse();
            }
            for (s, p, o) in facts {
                insert(&mut engine, &mut dict, s, p, o);
            }
            assert_eq!(
                decoded(&dict, &deductions(&engine)),
                vec!["alice notifiedAbout status .", "bob notifiedAbout review ."]
            );
        }
    }

    const MIXED_RULES: &str = "
        [trans: (?a r ?b) (?b r ?c) -> (?a r ?c)]
        [cycle: (?a s ?b) (?b s ?c) (?c s ?a) -> (?a t ?c)]
        [self: (?a s ?a) -> (?a u ?a)]
        [byPredicate: (?x ?p n0) (?x s ?y) -> (?y u ?x)]
        [anyLink: (?x _ ?y) (?y q ?z) -> (?x w ?z)]
    ";

    fn match_body(
        body: &[TriplePattern],
        facts: &BTreeSet<Triple>,
        bindings: &mut Vec<Option<u32>>,
        out: &mut Vec<Vec<Option<u32>>>,
    ) {
        let Some((first, rest)) = body.split_first() else {
            out.push(bindings.clone());
            return;
        };
        for fact in facts {
            let saved = bindings.clone();
            let slots = [
                (&first.subject, fact.subject),
                (&first.predicate, fact.predicate),
                (&first.object, fact.object),
            ];
            let matched = slots.iter().all(|(term, value)| match term {
                Term::Constant(c) => c == value,
                Term::Wildcard => true,
                Term::Variable(v) => {
                    if let Some(bound) = bindings[*v] {
                        return bound == *value;
                    }
                    bindings[*v] = Some(*value);
                    true
                }
            });
            if matched {
                match_body(rest, facts, bindings, out);
            }
            *bindings = saved;
        }
    }

    fn ground(term: &Term, bindings: &[Option<u32>]) -> u32 {
        match term {
            Term::Constant(c) => *c,
            Term::Variable(v) => bindings[*v].unwrap(),
            Term::Wildcard => panic!("wildcard in head"),
        }
    }

    /// Applies every rule to every fact until nothing changes.
    fn naive_closure(rules: &[Rule], facts: &[Triple]) -> Vec<Triple> {
        let mut known: BTreeSet<Triple> = facts.iter().copied().collect();
        loop {
            let mut derived = Vec::new();
            for rule in rules {
                let mut matches = Vec::new();
                match_body(&rule.body, &known, &mut vec![None; rule.num_vars], &mut matches);
                for bindings in &matches {
                    for head in &rule.head {
                        derived.push(Triple::new(
                            ground(&head.subject, bindings),
                            ground(&head.predicate, bindings),
                            ground(&head.object, bindings),
                        ));
                    }
                }
            }
            let before = known.len();
            known.extend(derived);
            if known.len() == before {
                return known.into_iter().collect();
            }
        }
    }

    #[test]
    fn test_matches_naive_closure_on_random_facts() {
        init_logger();
        for round in 0..60u64 {
            let mut rng = StdRng::seed_from_u64(round);
            let mut dict = Dictionary::new();
            let rules = parse_rules(MIXED_RULES, &mut dict).unwrap();
            let nodes: Vec<String> = (0..5).map(|i| format!("n{}", i)).collect();
            let predicates = ["r", "s", "q", "other"];

            let mut facts: Vec<Triple> = (0..rng.gen_range(3..14))
                .map(|_| {
                    let s = &nodes[rng.gen_range(0..nodes.len())];
                    let p = predicates[rng.gen_range(0..predicates.len())];
                    let o = &nodes[rng.gen_range(0..nodes.len())];
                    dict.encode_triple(s, p, o)
                })
                .collect();
            facts.shuffle(&mut rng);
            let expected = naive_closure(&rules, &facts);

            // Some facts are loaded at bootstrap, the rest arrive one by one.
            let split = rng.gen_range(0..=facts.len());
            let graph = MemoryInfGraph::with_raw(&facts[..split]);
            let mut engine = ReteEngine::new(graph, rules, EngineConfig::default());
            engine.init(true).unwrap();
            for t in &facts[split..] {
                engine.add(*t).unwrap();
            }

            let actual = engine.graph().find(None, None, None).unwrap();
            assert_eq!(actual, expected, "round {} with facts {:?}", round, decoded(&dict, &facts));
        }
    }

    /// Raw store that logs the predicate of every scan and can be switched
    /// off.
    #[derive(Default)]
    struct RecordingSource {
        inner: UnifiedIndex,
        scans: RefCell<Vec<Option<u32>>>,
        offline: bool,
    }

    impl TripleSource for RecordingSource {
        fn find(
            &self,
            s: Option<u32>,
            p: Option<u32>,
            o: Option<u32>,
        ) -> Result<Vec<Triple>, GraphError> {
            if self.offline {
                return Err(GraphError::Unavailable("raw store offline".to_string()));
            }
            self.scans.borrow_mut().push(p);
            Ok(self.inner.query(s, p, o))
        }
    }

    #[derive(Default)]
    struct RecordingGraph {
        raw: RecordingSource,
        deductions: UnifiedIndex,
    }

    impl ForwardInfGraph for RecordingGraph {
        type Raw = RecordingSource;
        type Deductions = UnifiedIndex;

        fn raw_graph(&self) -> Option<&RecordingSource> {
            Some(&self.raw)
        }

        fn deductions_graph(&self) -> &UnifiedIndex {
            &self.deductions
        }

        fn deductions_graph_mut(&mut self) -> &mut UnifiedIndex {
            &mut self.deductions
        }

        fn add_raw(&mut self, triple: &Triple) -> Result<bool, GraphError> {
            if self.raw.offline {
                return Err(GraphError::Unavailable("raw store offline".to_string()));
            }
            Ok(self.raw.inner.insert(triple))
        }
    }

    fn recording_engine(
        rules: &str,
        raw: &[(&str, &str, &str)],
    ) -> (Dictionary, ReteEngine<RecordingGraph>) {
        init_logger();
        let mut dict = Dictionary::new();
        let rules = parse_rules(rules, &mut dict).unwrap();
        let mut graph = RecordingGraph::default();
        for &(s, p, o) in raw {
            graph.raw.inner.insert(&dict.encode_triple(s, p, o));
        }
        (dict, ReteEngine::new(graph, rules, EngineConfig::default()))
    }

    #[test]
    fn test_bootstrap_scans_only_used_predicates() {
        let raw = [("a", "ancestor", "b"), ("b", "ancestor", "c"), ("c", "unrelated", "d")];
        let (dict, mut engine) = recording_engine(ANCESTOR, &raw);
        engine.init(true).unwrap();

        let ancestor = dict.lookup("ancestor");
        let scans = engine.graph().raw.scans.borrow();
        assert!(!scans.is_empty());
        assert!(scans.iter().all(|p| *p == ancestor));
        assert_eq!(engine.graph().deductions.len(), 1);
    }

    #[test]
    fn test_wildcard_bootstrap_scans_everything() {
        let rule = "[seen: (?s ?p ?o) -> (?s seen yes)]";
        let (_, mut engine) = recording_engine(rule, &[("c", "unrelated", "d")]);
        engine.init(true).unwrap();
        assert_eq!(engine.graph().raw.scans.borrow().first(), Some(&None));
        assert_eq!(engine.graph().deductions.len(), 1);
    }

    #[test]
    fn test_store_failures_propagate() {
        let (mut dict, mut engine) = recording_engine(ANCESTOR, &[]);
        engine.init(true).unwrap();

        engine.graph_mut().raw.offline = true;
        let t = dict.encode_triple("a", "ancestor", "b");
        let err = engine.add(t).unwrap_err();
        assert!(matches!(err, ReteError::Graph(GraphError::Unavailable(_))));

        let err = engine.init(true).unwrap_err();
        assert!(matches!(err, ReteError::Graph(_)));
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }
}
