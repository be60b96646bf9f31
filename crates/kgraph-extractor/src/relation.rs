//! Relation Extraction (RE) module
//!
//! Walks a dependency parse and emits scored candidate triples between
//! entity mentions using three rule passes:
//! - verb-argument: subject and object children of a lexicon verb
//! - copula: subject and predicate of "be" become `IS_A`
//! - possessive: a possessor owns its syntactic head
//!
//! Candidates below the score threshold are dropped and the rest are
//! deduplicated case-insensitively.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::parse::{Parse, Token};
use crate::RelationExtractor;
use kgraph_core::{EntityMention, RelationType, Result, ScoredTriple, Triple};

/// Score below which candidates are discarded
pub const DEFAULT_MIN_SCORE: u8 = 5;

const COPULA_SCORE: u8 = 6;
const POSSESSIVE_SCORE: u8 = 5;

const SUBJECT_DEPS: [&str; 2] = ["nsubj", "nsubjpass"];
const OBJECT_DEPS: [&str; 2] = ["dobj", "pobj"];
const PREDICATE_DEPS: [&str; 2] = ["attr", "acomp"];

// ============================================================================
// Verb lexicon
// ============================================================================

static STANDARD_LEXICON: Lazy<Arc<VerbLexicon>> = Lazy::new(|| Arc::new(VerbLexicon::standard()));

/// Immutable mapping from verb lemma to relation and rule confidence
#[derive(Debug, Clone)]
pub struct VerbLexicon {
    entries: HashMap<String, (RelationType, u8)>,
    fallback: (RelationType, u8),
}

impl VerbLexicon {
    /// Build the standard lexicon
    ///
    /// Both inflected forms ("founded") and base forms ("found") are listed
    /// so the lookup works whichever the annotator reports as lemma.
    pub fn standard() -> Self {
        let mut lexicon = Self {
            entries: HashMap::new(),
            fallback: (RelationType::RelatedTo, 3),
        };

        lexicon.add(&["founded", "found"], RelationType::Founded, 9);
        lexicon.add(&["established", "establish"], RelationType::Founded, 9);
        lexicon.add(&["created", "create"], RelationType::Founded, 8);
        lexicon.add(&["owns", "own"], RelationType::Owns, 8);
        lexicon.add(&["controls", "control"], RelationType::Owns, 7);
        lexicon.add(&["acquired", "acquire"], RelationType::Acquired, 9);
        lexicon.add(&["works", "work"], RelationType::WorksFor, 6);
        lexicon.add(&["leads", "lead"], RelationType::Leads, 7);
        lexicon.add(&["manages", "manage"], RelationType::Leads, 6);
        lexicon.add(&["located", "locate"], RelationType::LocatedIn, 6);
        lexicon.add(&["based", "base"], RelationType::LocatedIn, 6);
        lexicon.add(&["headquartered", "headquarter"], RelationType::LocatedIn, 7);
        lexicon.add(&["teaches", "teach"], RelationType::Teaches, 6);
        lexicon.add(&["studies", "study"], RelationType::Studies, 5);
        lexicon.add(&["develops", "develop"], RelationType::Develops, 6);

        lexicon
    }

    /// Build a lexicon from explicit entries
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, RelationType, u8)>,
        S: AsRef<str>,
    {
        let mut lexicon = Self {
            entries: HashMap::new(),
            fallback: (RelationType::RelatedTo, 3),
        };
        for (lemma, relation, score) in entries {
            lexicon
                .entries
                .insert(lemma.as_ref().to_lowercase(), (relation, score));
        }
        lexicon
    }

    fn add(&mut self, lemmas: &[&str], relation: RelationType, score: u8) {
        for lemma in lemmas {
            self.entries.insert(lemma.to_string(), (relation, score));
        }
    }

    /// Relation and score for a (lowercased) lemma, or the generic fallback
    pub fn lookup(&self, lemma: &str) -> (RelationType, u8) {
        self.entries.get(lemma).copied().unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Rule-based RE
// ============================================================================

/// First entity whose text contains the token's text, ignoring case
pub fn find_entity_for_token<'a>(
    token: &Token,
    entities: &'a [EntityMention],
) -> Option<&'a EntityMention> {
    let needle = token.text.to_lowercase();
    entities
        .iter()
        .find(|e| e.text.to_lowercase().contains(&needle))
}

fn same_entity(a: &EntityMention, b: &EntityMention) -> bool {
    a.text.to_lowercase() == b.text.to_lowercase()
}

/// Rule-based relation extractor over dependency parses
pub struct RuleBasedRe {
    lexicon: Arc<VerbLexicon>,
    min_score: u8,
}

impl RuleBasedRe {
    /// Create with the standard lexicon and score threshold
    pub fn new() -> Self {
        Self {
            lexicon: Arc::clone(&STANDARD_LEXICON),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Use a custom verb lexicon
    pub fn with_lexicon(mut self, lexicon: VerbLexicon) -> Self {
        self.lexicon = Arc::new(lexicon);
        self
    }

    /// Set the minimum candidate score
    pub fn with_min_score(mut self, min_score: u8) -> Self {
        self.min_score = min_score;
        self
    }

    /// All candidate triples with their rule scores, before filtering
    pub fn candidates(&self, parse: &Parse, entities: &[EntityMention]) -> Vec<ScoredTriple> {
        let mut candidates = Vec::new();
        if entities.len() < 2 {
            return candidates;
        }

        self.verb_argument_pass(parse, entities, &mut candidates);
        self.copula_pass(parse, entities, &mut candidates);
        self.possessive_pass(parse, entities, &mut candidates);

        candidates
    }

    /// Drop weak candidates and deduplicate by case-insensitive key, keeping the first
    pub fn select(&self, candidates: Vec<ScoredTriple>) -> Vec<Triple> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| c.score >= self.min_score)
            .filter(|c| seen.insert(c.triple.dedup_key()))
            .map(|c| c.triple)
            .collect()
    }

    fn verb_argument_pass(
        &self,
        parse: &Parse,
        entities: &[EntityMention],
        out: &mut Vec<ScoredTriple>,
    ) {
        for (index, token) in parse.tokens.iter().enumerate() {
            if token.pos != "VERB" || token.is_stop {
                continue;
            }

            let (relation, score) = self.lexicon.lookup(&token.lemma.to_lowercase());
            if score < self.min_score {
                continue;
            }

            let mut subjects = Vec::new();
            let mut objects = Vec::new();

            for (child_index, child) in parse.children(index) {
                let dep = child.dep.as_str();
                if SUBJECT_DEPS.contains(&dep) {
                    subjects.extend(find_entity_for_token(child, entities));
                } else if OBJECT_DEPS.contains(&dep) {
                    objects.extend(find_entity_for_token(child, entities));
                } else if dep == "prep" {
                    for (_, grandchild) in parse.children(child_index) {
                        if grandchild.dep == "pobj" {
                            objects.extend(find_entity_for_token(grandchild, entities));
                        }
                    }
                }
            }

            emit_pairs(&subjects, &objects, relation, score, out);
        }
    }

    fn copula_pass(&self, parse: &Parse, entities: &[EntityMention], out: &mut Vec<ScoredTriple>) {
        for (index, token) in parse.tokens.iter().enumerate() {
            if token.lemma != "be" || !(token.pos == "AUX" || token.pos == "VERB") {
                continue;
            }

            let mut subjects = Vec::new();
            let mut predicates = Vec::new();

            for (_, child) in parse.children(index) {
                let dep = child.dep.as_str();
                if dep == "nsubj" {
                    subjects.extend(find_entity_for_token(child, entities));
                } else if PREDICATE_DEPS.contains(&dep) {
                    predicates.extend(find_entity_for_token(child, entities));
                }
            }

            emit_pairs(&subjects, &predicates, RelationType::IsA, COPULA_SCORE, out);
        }
    }

    fn possessive_pass(
        &self,
        parse: &Parse,
        entities: &[EntityMention],
        out: &mut Vec<ScoredTriple>,
    ) {
        for (index, token) in parse.tokens.iter().enumerate() {
            if token.dep != "poss" {
                continue;
            }

            let possessor = find_entity_for_token(token, entities);
            let possessed = parse
                .head_of(index)
                .and_then(|head| find_entity_for_token(head, entities));

            if let (Some(possessor), Some(possessed)) = (possessor, possessed) {
                if !same_entity(possessor, possessed) {
                    out.push(ScoredTriple {
                        triple: Triple::new(&possessor.text, RelationType::Owns, &possessed.text),
                        score: POSSESSIVE_SCORE,
                    });
                }
            }
        }
    }
}

fn emit_pairs(
    subjects: &[&EntityMention],
    objects: &[&EntityMention],
    relation: RelationType,
    score: u8,
    out: &mut Vec<ScoredTriple>,
) {
    for subject in subjects {
        for object in objects {
            if !same_entity(subject, object) {
                out.push(ScoredTriple {
                    triple: Triple::new(&subject.text, relation, &object.text),
                    score,
                });
            }
        }
    }
}

impl Default for RuleBasedRe {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationExtractor for RuleBasedRe {
    fn extract(&self, parse: &Parse, entities: &[EntityMention]) -> Result<Vec<Triple>> {
        let candidates = self.candidates(parse, entities);
        Ok(self.select(candidates))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::EntitySpan;

    fn mentions(items: &[(&str, &str)]) -> Vec<EntityMention> {
        items
            .iter()
            .map(|(text, label)| EntityMention::new(*text, *label))
            .collect()
    }

    /// "Steve Jobs founded Apple Inc in 1976"
    fn founding_parse() -> Parse {
        Parse::new(
            vec![
                Token::new("Steve", "Steve", "PROPN", "compound", 1),
                Token::new("Jobs", "Jobs", "PROPN", "nsubj", 2),
                Token::new("founded", "found", "VERB", "ROOT", 2),
                Token::new("Apple", "Apple", "PROPN", "compound", 4),
                Token::new("Inc", "Inc", "PROPN", "dobj", 2),
                Token::new("in", "in", "ADP", "prep", 2).stop(),
                Token::new("1976", "1976", "NUM", "pobj", 5),
            ],
            vec![
                EntitySpan::new("Steve Jobs", "PERSON"),
                EntitySpan::new("Apple Inc", "ORG"),
                EntitySpan::new("1976", "DATE"),
            ],
        )
    }

    #[test]
    fn test_lexicon_lookup() {
        let lexicon = VerbLexicon::standard();
        assert_eq!(lexicon.lookup("found"), (RelationType::Founded, 9));
        assert_eq!(lexicon.lookup("founded"), (RelationType::Founded, 9));
        assert_eq!(lexicon.lookup("headquarter"), (RelationType::LocatedIn, 7));
        assert_eq!(lexicon.lookup("study"), (RelationType::Studies, 5));
        assert_eq!(lexicon.lookup("eat"), (RelationType::RelatedTo, 3));
    }

    #[test]
    fn test_founding_scenario() {
        let re = RuleBasedRe::new();
        let entities = mentions(&[("Apple Inc", "ORG"), ("Steve Jobs", "PERSON")]);

        let triples = re.extract(&founding_parse(), &entities).unwrap();

        assert_eq!(
            triples,
            vec![Triple::new("Steve Jobs", RelationType::Founded, "Apple Inc")]
        );
    }

    #[test]
    fn test_fewer_than_two_entities() {
        let re = RuleBasedRe::new();
        let entities = mentions(&[("Steve Jobs", "PERSON")]);
        assert!(re.extract(&founding_parse(), &entities).unwrap().is_empty());
    }

    #[test]
    fn test_prepositional_object_one_hop() {
        // "Microsoft is headquartered in Redmond"
        let parse = Parse::new(
            vec![
                Token::new("Microsoft", "Microsoft", "PROPN", "nsubjpass", 2),
                Token::new("is", "be", "AUX", "auxpass", 2).stop(),
                Token::new("headquartered", "headquarter", "VERB", "ROOT", 2),
                Token::new("in", "in", "ADP", "prep", 2).stop(),
                Token::new("Redmond", "Redmond", "PROPN", "pobj", 3),
            ],
            vec![],
        );
        let entities = mentions(&[("Microsoft", "ORG"), ("Redmond", "GPE")]);

        let triples = RuleBasedRe::new().extract(&parse, &entities).unwrap();
        assert_eq!(
            triples,
            vec![Triple::new("Microsoft", RelationType::LocatedIn, "Redmond")]
        );
    }

    #[test]
    fn test_low_score_and_stop_verbs_skipped() {
        // "Google met Amazon" (fallback score) and a stop-word verb
        let parse = Parse::new(
            vec![
                Token::new("Google", "Google", "PROPN", "nsubj", 1),
                Token::new("met", "meet", "VERB", "ROOT", 1),
                Token::new("Amazon", "Amazon", "PROPN", "dobj", 1),
                Token::new("Oracle", "Oracle", "PROPN", "nsubj", 4),
                Token::new("made", "make", "VERB", "conj", 1).stop(),
                Token::new("Amazon", "Amazon", "PROPN", "dobj", 4),
            ],
            vec![],
        );
        let entities = mentions(&[("Google", "ORG"), ("Amazon", "ORG"), ("Oracle", "ORG")]);

        let re = RuleBasedRe::new();
        assert!(re.candidates(&parse, &entities).is_empty());
    }

    #[test]
    fn test_copula_is_a() {
        // "Louvre is a Paris Museum"
        let parse = Parse::new(
            vec![
                Token::new("Louvre", "Louvre", "PROPN", "nsubj", 1),
                Token::new("is", "be", "AUX", "ROOT", 1).stop(),
                Token::new("a", "a", "DET", "det", 4).stop(),
                Token::new("Paris", "Paris", "PROPN", "compound", 4),
                Token::new("Museum", "Museum", "PROPN", "attr", 1),
            ],
            vec![],
        );
        let entities = mentions(&[("Louvre", "FAC"), ("Paris Museum", "FAC")]);

        let scored = RuleBasedRe::new().candidates(&parse, &entities);
        assert_eq!(
            scored,
            vec![ScoredTriple {
                triple: Triple::new("Louvre", RelationType::IsA, "Paris Museum"),
                score: 6,
            }]
        );
    }

    #[test]
    fn test_possessive_owns() {
        // "Google 's Android dominates"
        let parse = Parse::new(
            vec![
                Token::new("Google", "Google", "PROPN", "poss", 2),
                Token::new("'s", "'s", "PART", "case", 0),
                Token::new("Android", "Android", "PROPN", "nsubj", 3),
                Token::new("dominates", "dominate", "VERB", "ROOT", 3),
            ],
            vec![],
        );
        let entities = mentions(&[("Google", "ORG"), ("Android", "PRODUCT")]);

        let triples = RuleBasedRe::new().extract(&parse, &entities).unwrap();
        assert_eq!(
            triples,
            vec![Triple::new("Google", RelationType::Owns, "Android")]
        );
    }

    #[test]
    fn test_substring_resolution_prefers_first_entity() {
        // "Apple acquired Apple Music": both tokens resolve to the first
        // entity containing "apple", so the pair collapses to a self-pair
        let parse = Parse::new(
            vec![
                Token::new("Apple", "Apple", "PROPN", "nsubj", 1),
                Token::new("acquired", "acquire", "VERB", "ROOT", 1),
                Token::new("Apple", "Apple", "PROPN", "compound", 3),
                Token::new("Apple", "Apple", "PROPN", "dobj", 1),
            ],
            vec![],
        );
        let entities = mentions(&[("Apple Inc", "ORG"), ("Apple Music", "PRODUCT")]);

        let token = &parse.tokens[0];
        assert_eq!(
            find_entity_for_token(token, &entities).map(|e| e.text.as_str()),
            Some("Apple Inc")
        );
        assert!(RuleBasedRe::new().extract(&parse, &entities).unwrap().is_empty());
    }

    #[test]
    fn test_dedup_case_insensitive() {
        // "Jobs founded Apple and Jobs established APPLE"
        let parse = Parse::new(
            vec![
                Token::new("Jobs", "Jobs", "PROPN", "nsubj", 1),
                Token::new("founded", "found", "VERB", "ROOT", 1),
                Token::new("Apple", "Apple", "PROPN", "dobj", 1),
                Token::new("Jobs", "Jobs", "PROPN", "nsubj", 4),
                Token::new("established", "establish", "VERB", "conj", 1),
                Token::new("APPLE", "APPLE", "PROPN", "dobj", 4),
            ],
            vec![],
        );
        let entities = mentions(&[("Steve Jobs", "PERSON"), ("Apple", "ORG")]);

        let re = RuleBasedRe::new();
        assert_eq!(re.candidates(&parse, &entities).len(), 2);
        assert_eq!(
            re.extract(&parse, &entities).unwrap(),
            vec![Triple::new("Steve Jobs", RelationType::Founded, "Apple")]
        );
    }

    #[test]
    fn test_custom_lexicon_and_threshold() {
        let parse = founding_parse();
        let entities = mentions(&[("Apple Inc", "ORG"), ("Steve Jobs", "PERSON")]);

        let re = RuleBasedRe::new()
            .with_lexicon(VerbLexicon::from_entries([("found", RelationType::Develops, 4)]))
            .with_min_score(4);
        assert_eq!(
            re.extract(&parse, &entities).unwrap(),
            vec![Triple::new("Steve Jobs", RelationType::Develops, "Apple Inc")]
        );

        let strict = RuleBasedRe::new().with_min_score(10);
        assert!(strict.extract(&parse, &entities).unwrap().is_empty());
    }
}
