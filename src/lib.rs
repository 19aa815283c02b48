pub mod core;
pub mod analysis;
pub mod index;
pub mod query;
pub mod search;
pub mod scoring;
pub mod writer;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                         TRIEDEX STRUCT ARCHITECTURE                          │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── CORE LAYER ──────────────────────────────────┐
│                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────┐  │
│  │                       struct FullTextIndex<K>                          │  │
│  │  config: IndexConfig                                                   │  │
│  │  current: RwLock<Arc<IndexSnapshot<K>>>   // Swapped on every commit   │  │
│  │  writer: WriteLock<WriterState<K>>        // tokio Mutex + timeout     │  │
│  │  objects: ObjectRegistry                  // TypeId -> definition      │  │
│  │  thesaurus: Arc<dyn Thesaurus>                                         │  │
│  │  query_parser: QueryParser                                             │  │
│  │  scorer: Bm25Scorer                                                    │  │
│  └────────────────────────────────────────────────────────────────────────┘  │
│                                                                              │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌────────────────────┐  │
│  │ struct IndexSnapshot │  │ struct FieldLookup   │  │ ObjectDefinition   │  │
│  │ • root: IndexNode    │  │ • _text = FieldId(0) │  │ • key reader       │  │
│  │ • metadata           │  │ • static fields      │  │ • field readers    │  │
│  │ • fields             │  │ • dynamic fields     │  │ • dynamic reader   │  │
│  │ • navigator pool     │  └──────────────────────┘  │ • freshness/magn.  │  │
│  └──────────────────────┘                            └────────────────────┘  │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── WRITE PATH ──────────────────────────────────┐
│                                                                              │
│  text / object ──► DocumentPreparer ──► PreparedDocument                     │
│                    (extract, tokenize, thesaurus)     │                      │
│                                                       ▼                      │
│                    WriteLock::acquire ──► PendingChange                      │
│                                           • IndexMutation (copy-on-write)    │
│                                           • IndexMetadata (shared paths)     │
│                                           • Arc<FieldLookup> (make_mut)      │
│                                                       │                      │
│                                                       ▼ commit               │
│                                           new IndexSnapshot ──► publish      │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── TRIE LAYER ──────────────────────────────────┐
│                                                                              │
│  IndexNode { intra_node_text, children: ChildNodeMap, matches }              │
│       │                                                                      │
│       ├── ChildNodeMap: [(char, Arc<IndexNode>)] sorted by char              │
│       └── DocumentTokenMatchMap: DocumentId ──► [IndexedToken], shared paths │
│                                                                              │
│  IndexNavigator: (node, text offset) cursor, bookmarks, pooled               │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── READ PATH ───────────────────────────────────┐
│                                                                              │
│  "a & b" ──► lexer (nom) ──► QueryParser ──► QueryPart tree                  │
│                                                   │                          │
│                                                   ▼                          │
│  QueryExecutor ── navigator / fuzzy / wildcard ──► DocumentTokenMatchMap     │
│       │                                                   │                  │
│       │                                 QueryScorer (BM25 + boosts)          │
│       │                                                   ▼                  │
│       └──── mergers (intersect, union, except, ──► IntermediateQueryResult   │
│             preceding, near)                              │                  │
│                                                           ▼                  │
│                                                    SearchResults<K>          │
└──────────────────────────────────────────────────────────────────────────────┘
*/
