mod session;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use futures_util::{stream::StreamExt, SinkExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blackjack_table_core::{ClientMessage, ServerMessage, Table, TableConfig};
use session::Session;

/// 21 点牌桌服务器，每个 WebSocket 连接独占一张牌桌
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 监听地址
    #[arg(short, long, default_value = "0.0.0.0:25917")]
    addr: SocketAddr,

    /// JSON 格式的牌桌配置文件，缺省使用默认配置
    #[arg(short, long)]
    config: Option<PathBuf>,
}

// 服务器全局状态，所有连接共享同一份牌桌配置
struct AppState {
    config: TableConfig,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    config.validate().context("牌桌配置无效")?;
    info!("牌桌配置: 初始余额 {}，单局上限 {}", config.starting_balance, config.max_bet);

    let state = SharedState::new(AppState { config });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("无法监听 {}", args.addr))?;
    info!("服务器正在监听 {}", args.addr);
    axum::serve(listener, app).await.context("服务器异常退出")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TableConfig> {
    let Some(path) = path else {
        return Ok(TableConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("无法读取配置文件 {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("无法解析配置文件 {}", path.display()))
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    let table = match Table::new(&state.config) {
        Ok(table) => table,
        Err(e) => {
            warn!("无法开启牌桌: {}", e);
            return;
        }
    };

    // 会话产生的消息经由通道交给写任务
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    let (cmd_tx, cmd_rx) = mpsc::channel::<ClientMessage>(32);
    let session = tokio::spawn(Session::new(table, cmd_rx, tx).run());

    // 主循环，把客户端的消息转交给会话
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    if cmd_tx.send(client_msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 关闭指令通道，会话随之结束
    drop(cmd_tx);
    if let Err(e) = session.await {
        warn!("会话任务异常结束: {}", e);
    }
    info!("客户端连接关闭");
}
