//! Servidor web Axum com WebSocket para decodificação de árvores de dependência

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use depparse_core::{
    loss::sentence_margin_loss,
    pipeline::{ParserPipeline, PipelineEvent, SentenceInput},
    treebank::get_treebank,
    DecodeConfig, DecodeError, DecoderMode, DependencyTree, ScoreMatrix, SentenceLoss,
    TreeDecoder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: ParserPipeline,
}

/// Linhas da matriz `[head][dependente]`; `null` representa um arco proibido (`-∞`).
type ScoreRows = Vec<Vec<Option<f64>>>;

#[derive(Deserialize)]
struct DecodeRequest {
    scores: ScoreRows,
    length: usize,
    #[serde(default)]
    mode: Option<DecoderMode>,
}

#[derive(Serialize)]
struct DecodeResponse {
    heads: Vec<usize>,
    score: f64,
    projective: bool,
    decoder: &'static str,
}

#[derive(Deserialize)]
struct DecodeBatchRequest {
    batch: Vec<ScoreRows>,
    lengths: Vec<usize>,
    #[serde(default)]
    mode: Option<DecoderMode>,
}

#[derive(Serialize)]
struct DecodeBatchResponse {
    trees: Vec<Vec<usize>>,
    decoder: &'static str,
    processing_ms: u64,
}

#[derive(Deserialize)]
struct LossRequest {
    scores: ScoreRows,
    gold: Vec<usize>,
    length: usize,
    /// Árvore já decodificada; ausente, o servidor decodifica com `mode`.
    #[serde(default)]
    decoded: Option<Vec<usize>>,
    #[serde(default)]
    mode: Option<DecoderMode>,
}

#[derive(Serialize)]
struct LossResponse {
    decoded: Vec<usize>,
    #[serde(flatten)]
    loss: SentenceLoss,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    #[serde(default)]
    sentences: Option<Vec<SentenceInput>>,
    /// Índice de uma sentença de `/samples`.
    #[serde(default)]
    sample: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    info!(mode = config.mode.name(), workers = config.worker_count(), "configuração carregada");

    let pipeline = ParserPipeline::new(config)?;
    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/decode", post(decode_handler))
        .route("/decode-batch", post(decode_batch_handler))
        .route("/loss", post(loss_handler))
        .route("/samples", get(samples_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("DEPPARSE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Servidor de parsing iniciado em http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Lê `DEPPARSE_CONFIG` (arquivo JSON com `mode` e `workers`), se definido.
fn load_config() -> Result<DecodeConfig, Box<dyn std::error::Error>> {
    match std::env::var("DEPPARSE_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)?;
            Ok(DecodeConfig::from_json(&json)?)
        }
        Err(_) => Ok(DecodeConfig::default()),
    }
}

/// Converte as linhas JSON numa matriz, trocando `null` por `-∞`.
fn rows_to_matrix(rows: ScoreRows) -> Result<ScoreMatrix, DecodeError> {
    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| v.unwrap_or(f64::NEG_INFINITY))
                .collect()
        })
        .collect();
    ScoreMatrix::from_rows(rows)
}

fn bad_request(e: DecodeError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": e.to_string(),
            "sentence": e.failed_sentence(),
        })),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Decodifica uma única matriz
async fn decode_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecodeRequest>,
) -> Response {
    let mode = req.mode.unwrap_or(state.pipeline.config().mode);
    let scores = match rows_to_matrix(req.scores) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };
    let length = req.length;

    let result = tokio::task::spawn_blocking(move || decode_one(mode, &scores, length)).await;

    match result {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => bad_request(e),
        Err(e) => internal_error(format!("tarefa de decodificação abortada: {e}")),
    }
}

fn decode_one(mode: DecoderMode, scores: &ScoreMatrix, length: usize) -> Result<DecodeResponse, DecodeError> {
    let tree = mode.decode(scores, length)?;
    Ok(DecodeResponse {
        score: tree.score(scores),
        projective: tree.is_projective(),
        decoder: mode.name(),
        heads: tree.into_heads(),
    })
}

/// Decodifica um lote no pool de workers do servidor
async fn decode_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecodeBatchRequest>,
) -> Response {
    let start = Instant::now();
    let mode = req.mode.unwrap_or(state.pipeline.config().mode);
    let batch = match req
        .batch
        .into_iter()
        .enumerate()
        .map(|(i, rows)| {
            rows_to_matrix(rows).map_err(|e| DecodeError::BatchFailure {
                sentence: i,
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(b) => b,
        Err(e) => return bad_request(e),
    };
    let lengths = req.lengths;

    // Decodificação é CPU pura: roda fora do runtime assíncrono
    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        worker_state
            .pipeline
            .batch_decoder()
            .decode_batch_with(&mode, &batch, &lengths)
    })
    .await;

    match result {
        Ok(Ok(trees)) => Json(DecodeBatchResponse {
            trees: trees.into_iter().map(DependencyTree::into_heads).collect(),
            decoder: mode.name(),
            processing_ms: start.elapsed().as_millis() as u64,
        })
        .into_response(),
        Ok(Err(e)) => bad_request(e),
        Err(e) => internal_error(format!("tarefa de decodificação abortada: {e}")),
    }
}

/// Hinge loss de uma sentença contra a sua árvore gold
async fn loss_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LossRequest>,
) -> Response {
    let mode = req.mode.unwrap_or(state.pipeline.config().mode);
    let scores = match rows_to_matrix(req.scores) {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let result = tokio::task::spawn_blocking(move || {
        sentence_loss(mode, &scores, &req.gold, req.decoded, req.length)
    })
    .await;

    match result {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => bad_request(e),
        Err(e) => internal_error(format!("tarefa de loss abortada: {e}")),
    }
}

/// Decodifica (se a árvore não veio na requisição) e calcula a loss.
fn sentence_loss(
    mode: DecoderMode,
    scores: &ScoreMatrix,
    gold: &[usize],
    decoded: Option<Vec<usize>>,
    length: usize,
) -> Result<LossResponse, DecodeError> {
    let decoded = match decoded {
        Some(heads) => heads,
        None => mode.decode(scores, length)?.into_heads(),
    };
    let loss = sentence_margin_loss(scores, gold, &decoded, length)?;
    Ok(LossResponse { decoded, loss })
}

/// Retorna as sentenças de demonstração com as árvores gold
async fn samples_handler() -> impl IntoResponse {
    let samples: Vec<serde_json::Value> = get_treebank()
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            serde_json::json!({
                "index": index,
                "domain": sentence.domain,
                "text": sentence.text,
                "input": SentenceInput::from(sentence),
            })
        })
        .collect();
    Json(samples)
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lógica do WebSocket: recebe sentenças, executa o pipeline e envia os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let inputs = match parse_ws_request(&text) {
                    Ok(inputs) => inputs,
                    Err(message) => {
                        warn!(%message, "requisição WebSocket inválida");
                        let event = PipelineEvent::Error {
                            message,
                            sentence: None,
                        };
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json)).await.is_err() {
                                return;
                            }
                        }
                        continue;
                    }
                };

                info!(sentences = inputs.len(), "Parsing via WebSocket");

                let (tx_std, rx_std) = std::sync::mpsc::channel::<PipelineEvent>();
                let pipeline_arc = Arc::clone(&state);

                // Pipeline síncrono roda numa thread de bloqueio
                let handle = tokio::task::spawn_blocking(move || {
                    pipeline_arc.pipeline.run_streaming(&inputs, tx_std);
                });
                handle.await.ok();

                let events: Vec<PipelineEvent> = rx_std.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

fn parse_ws_request(text: &str) -> Result<Vec<SentenceInput>, String> {
    let req: WsRequest =
        serde_json::from_str(text).map_err(|e| format!("JSON inválido: {e}"))?;
    match (req.sentences, req.sample) {
        (Some(sentences), _) => Ok(sentences),
        (None, Some(index)) => get_treebank()
            .get(index)
            .map(|s| vec![SentenceInput::from(s)])
            .ok_or_else(|| format!("amostra {index} não existe")),
        (None, None) => Err("informe `sentences` ou `sample`".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_scores_become_masked() {
        let m = rows_to_matrix(vec![vec![None, Some(1.0)], vec![Some(2.0), None]]).unwrap();
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 1), f64::NEG_INFINITY);
        assert!(rows_to_matrix(vec![vec![Some(1.0)], vec![]]).is_err());
    }

    fn example_rows() -> ScoreRows {
        vec![
            vec![None, Some(2.0), Some(3.0)],
            vec![None, None, Some(1.0)],
            vec![None, Some(5.0), None],
        ]
    }

    #[test]
    fn test_decode_one_reports_tree() {
        let scores = rows_to_matrix(example_rows()).unwrap();
        let response = decode_one(DecoderMode::Arborescence, &scores, 3).unwrap();
        assert_eq!(response.heads, vec![0, 2, 0]);
        assert_eq!(response.score, 8.0);
        assert!(response.projective);
        assert!(decode_one(DecoderMode::Projective, &scores, 0).is_err());
    }

    #[test]
    fn test_sentence_loss_decodes_when_tree_missing() {
        let scores = rows_to_matrix(example_rows()).unwrap();
        let response = sentence_loss(DecoderMode::Projective, &scores, &[0, 0, 1], None, 3).unwrap();
        assert_eq!(response.decoded, vec![0, 2, 0]);
        assert_eq!(response.loss.loss, 6.0);
        let response =
            sentence_loss(DecoderMode::Projective, &scores, &[0, 2, 0], Some(vec![0, 0, 1]), 3).unwrap();
        assert_eq!(response.loss.loss, 0.0);
    }

    #[test]
    fn test_ws_request_variants() {
        assert_eq!(parse_ws_request(r#"{"sample": 0}"#).unwrap().len(), 1);
        let inputs = parse_ws_request(r#"{"sentences": [{"words": ["Chove"], "pos": ["VERB"]}]}"#)
            .unwrap();
        assert!(inputs[0].gold.is_none());
        assert!(parse_ws_request(r#"{"sample": 999}"#).is_err());
        assert!(parse_ws_request("{}").is_err());
        assert!(parse_ws_request("texto solto").is_err());
    }
}
