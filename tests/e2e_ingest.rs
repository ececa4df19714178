//! End-to-end tests for the ingestion pipeline.
//!
//! Each test drives `Explorer::upload()` through an `UploadPipeline` over a
//! `MemoryTransport`, then checks what reached the store and the surface.

use bytes::Bytes;
use ifc_graph_explorer::ingest::memory::{RecordedRequest, CHUNK_ACK};
use ifc_graph_explorer::ingest::MemoryTransport;
use ifc_graph_explorer::{
    Edge, EdgeId, Error, Explorer, ExplorerConfig, Graph, GraphDocument, Node, NodeId,
    RenderSurface, SourceFile, TransportMode, UploadPipeline,
};
use pretty_assertions::assert_eq;

fn small_graph() -> GraphDocument {
    let nodes = vec![
        Node::new("1", "Wall").with_label("Wall 1"),
        Node::new("2", "Wall").with_label("Wall 2"),
        Node::new("3", "Door").with_label("Door 3"),
    ];
    let edges = vec![Edge::new("e1", "1", "3"), Edge::new("e2", "2", "99")];
    GraphDocument::from_parts(&nodes, &edges)
}

fn ifc_file(len: usize) -> SourceFile {
    let body: Vec<u8> = b"ISO-10303-21;".iter().copied().cycle().take(len).collect();
    SourceFile::new("tower.ifc", body)
}

// ============================================================================
// 1. Dangling edges are dropped at ingestion
// ============================================================================

#[tokio::test]
async fn test_dangling_edge_dropped_on_upload() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let transport = MemoryTransport::responding(&small_graph()).unwrap();
    let pipeline = UploadPipeline::new(transport);

    let report = explorer.upload(&pipeline, &ifc_file(100), |_| {}).await.unwrap();

    assert_eq!(report.node_count, 3);
    assert_eq!(report.edge_count, 1);
    assert_eq!(report.dropped_edges, 1);
    assert!(explorer.is_loaded());
    assert!(!explorer.is_loading());
    assert_eq!(explorer.entity_types(), &["Wall".to_string(), "Door".to_string()]);

    explorer.toggle_type("Wall");
    explorer.toggle_type("Door");
    let shown: Vec<EdgeId> = explorer.surface().edges().into_iter().map(|e| e.id).collect();
    assert_eq!(shown, vec![EdgeId::from("e1")]);
}

// ============================================================================
// 2. Chunked transport: ordered metadata, progress, terminal response only
// ============================================================================

#[tokio::test]
async fn test_chunked_upload_metadata_and_progress() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let transport = MemoryTransport::responding(&small_graph()).unwrap();
    let pipeline = UploadPipeline::new(transport.clone()).with_chunk_size(40);

    let mut percents = Vec::new();
    let report = explorer
        .upload(&pipeline, &ifc_file(100), |p| percents.push(p.percent()))
        .await
        .unwrap();

    assert_eq!(percents, vec![33, 67, 100]);
    assert_eq!(report.chunks_sent, 3);

    let chunks = transport.chunks();
    assert_eq!(chunks.iter().map(|c| c.chunk_number).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(chunks.iter().all(|c| c.total_chunks == 3));
    assert!(chunks.iter().all(|c| Some(&c.file_id) == report.file_id.as_ref()));

    let sizes: Vec<usize> = transport
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            RecordedRequest::Chunk { len, .. } => Some(len),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![40, 40, 20]);

    let progress = explorer.upload_progress().unwrap();
    assert_eq!((progress.chunks_sent, progress.total_chunks), (3, 3));
}

#[tokio::test]
async fn test_intermediate_acks_are_not_parsed() {
    // The acks are not graph documents; the upload succeeds only because
    // nothing but the terminal body is parsed.
    assert!(GraphDocument::from_slice(CHUNK_ACK).is_err());

    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let doc = small_graph();
    let file = SourceFile::new("graph.json", serde_json::to_vec(&doc).unwrap());
    let pipeline = UploadPipeline::new(MemoryTransport::echo()).with_chunk_size(16);

    let report = explorer.upload(&pipeline, &file, |_| {}).await.unwrap();
    assert!(report.chunks_sent > 1);
    assert_eq!(report.node_count, 3);
}

// ============================================================================
// 3. Single-shot transport
// ============================================================================

#[tokio::test]
async fn test_single_shot_upload() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let transport = MemoryTransport::responding(&small_graph()).unwrap();
    let pipeline = UploadPipeline::new(transport.clone())
        .with_chunk_size(10)
        .with_mode(TransportMode::SingleShot);

    let mut percents = Vec::new();
    let report = explorer
        .upload(&pipeline, &ifc_file(100), |p| percents.push(p.percent()))
        .await
        .unwrap();

    assert_eq!(percents, vec![100]);
    assert_eq!(report.chunks_sent, 1);
    assert_eq!(
        transport.requests(),
        vec![RecordedRequest::File { name: "tower.ifc".into(), len: 100 }]
    );
}

// ============================================================================
// 4. Failures leave the session graph-less
// ============================================================================

#[tokio::test]
async fn test_transport_failure_clears_previous_graph() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    explorer.load_graph(small_graph()).unwrap();
    explorer.toggle_type("Wall");
    explorer.select_node(&NodeId::from("1")).unwrap();
    assert_eq!(explorer.surface().node_count(), 2);

    let transport = MemoryTransport::responding(&small_graph())
        .unwrap()
        .with_failure_on_chunk(1);
    let pipeline = UploadPipeline::new(transport.clone()).with_chunk_size(40);

    let mut percents = Vec::new();
    let err = explorer
        .upload(&pipeline, &ifc_file(100), |p| percents.push(p.percent()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport { chunk: 1, total_chunks: 3, .. }));
    assert_eq!(percents, vec![33]);
    // Chunk 2 is never attempted.
    assert_eq!(transport.chunks().len(), 2);

    assert!(!explorer.is_loaded());
    assert!(!explorer.is_loading());
    assert_eq!(explorer.surface().node_count(), 0);
    assert!(explorer.entity_types().is_empty());
    assert!(explorer.active_types().is_empty());
    assert_eq!(explorer.selected(), None);
}

#[tokio::test]
async fn test_garbage_terminal_response() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let transport = MemoryTransport::new(ifc_graph_explorer::ingest::memory::Responder::Fixed(
        Bytes::from_static(b"<html>502 Bad Gateway</html>"),
    ));
    let pipeline = UploadPipeline::new(transport);

    let err = explorer.upload(&pipeline, &ifc_file(10), |_| {}).await.unwrap_err();
    assert!(matches!(err, Error::IngestData(_)));
    assert!(!explorer.is_loaded());
    assert!(!explorer.is_loading());
}

#[tokio::test]
async fn test_missing_edges_array_is_no_graph_data() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let file = SourceFile::new("bad.json", r#"{"nodes": []}"#);
    let pipeline = UploadPipeline::new(MemoryTransport::echo());

    let err = explorer.upload(&pipeline, &file, |_| {}).await.unwrap_err();
    assert!(matches!(err, Error::IngestData(_)));
}

#[tokio::test]
async fn test_empty_file() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let transport = MemoryTransport::echo();
    let pipeline = UploadPipeline::new(transport.clone());

    let err = explorer
        .upload(&pipeline, &SourceFile::new("empty.ifc", Vec::<u8>::new()), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, Error::IngestData(_)));
    assert!(transport.requests().is_empty());
    assert!(!explorer.is_loaded());
}

// ============================================================================
// 5. File ids
// ============================================================================

#[tokio::test]
async fn test_file_ids_unique_per_attempt() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let pipeline = UploadPipeline::new(MemoryTransport::responding(&small_graph()).unwrap());

    let a = explorer.upload(&pipeline, &ifc_file(10), |_| {}).await.unwrap();
    let b = explorer.upload(&pipeline, &ifc_file(10), |_| {}).await.unwrap();

    let a: i64 = a.file_id.unwrap().parse().unwrap();
    let b: i64 = b.file_id.unwrap().parse().unwrap();
    assert!(b > a);
}

// ============================================================================
// 6. Default graph asset
// ============================================================================

#[test]
fn test_default_graph_missing_is_not_an_error() {
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let path = std::env::temp_dir().join("ifc-graph-explorer-does-not-exist.json");
    assert!(explorer.load_default_graph(&path).unwrap().is_none());
    assert!(!explorer.is_loaded());
}

#[test]
fn test_default_graph_loaded_from_disk() {
    let path = std::env::temp_dir().join(format!("ifc-graph-explorer-default-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_vec(&small_graph()).unwrap()).unwrap();

    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let report = explorer.load_default_graph(&path).unwrap().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(report.file_id, None);
    assert_eq!(report.node_count, 3);
    assert!(explorer.is_loaded());
}

// ============================================================================
// 7. Neighbour fetch
// ============================================================================

#[tokio::test]
async fn test_expand_remote() {
    let full = Graph::new(
        vec![Node::new("1", "Wall"), Node::new("3", "Door"), Node::new("7", "Slab")],
        vec![Edge::new("e1", "1", "3"), Edge::new("e7", "3", "7")],
    );
    let source = MemoryTransport::echo().with_neighbor_graph(full);

    // Only the walls are held locally.
    let mut explorer = Explorer::in_memory(ExplorerConfig::default());
    let local = vec![Node::new("1", "Wall")];
    explorer.load_graph(GraphDocument::from_parts(&local, std::iter::empty())).unwrap();
    explorer.toggle_type("Wall");

    let summary = explorer.expand_remote(&source, &NodeId::from("1")).await.unwrap();
    assert_eq!(summary.nodes_added, 1);
    assert_eq!(summary.edges_added, 1);
    assert!(explorer.surface().contains_node(&NodeId::from("3")));
    assert!(!explorer.surface().contains_node(&NodeId::from("7")));

    // Undisplayed node: nothing fetched.
    let before = source.requests().len();
    let summary = explorer.expand_remote(&source, &NodeId::from("7")).await.unwrap();
    assert!(summary.is_noop());
    assert_eq!(source.requests().len(), before);
}

// ============================================================================
// 8. Reloading replaces the whole view
// ============================================================================

#[test]
fn test_reload_does_not_inherit_positions() {
    let walls: Vec<Node> = (0..50).map(|i| Node::new(format!("#{i}"), "IfcWall")).collect();
    let mut explorer = Explorer::in_memory(ExplorerConfig::default().with_default_cap(60));
    explorer.load_graph(GraphDocument::from_parts(&walls, std::iter::empty())).unwrap();
    explorer.toggle_type("IfcWall");
    let old = explorer.surface().position(&NodeId::from("#7"));
    assert!(old.is_some());

    // STEP ids repeat across files; `#7` here is a different element.
    let door = vec![Node::new("#7", "IfcDoor")];
    explorer.load_graph(GraphDocument::from_parts(&door, std::iter::empty())).unwrap();
    assert_eq!(explorer.surface().node_count(), 0);
    assert_eq!(explorer.surface().position(&NodeId::from("#30")), None);
    assert_eq!(explorer.surface().position(&NodeId::from("#7")), None);

    explorer.toggle_type("IfcDoor");
    let new = explorer.surface().position(&NodeId::from("#7"));
    assert!(new.is_some());
    assert_ne!(old, new);
}
