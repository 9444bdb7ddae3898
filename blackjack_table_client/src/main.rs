mod render;

use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use blackjack_table_core::{ClientMessage, ServerMessage};
use render::{auto_reply, parse_command, render};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string()))?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 输入循环和接收任务都要发消息，统一经由通道交给写任务
    let (tx, mut rx) = mpsc::channel::<ClientMessage>(32);
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(payload) = serde_json::to_string(&msg) else { continue };
            if write.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 启动一个任务来处理从服务器接收的消息
    let settle_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        println!("\n{}", render(&server_msg));
                        if let Some(reply) = auto_reply(&server_msg) {
                            if settle_tx.send(reply).await.is_err() {
                                // 写任务已退出，说明连接已断开
                                eprintln!("连接已断开");
                                break;
                            }
                        }
                        if let Err(e) = prompt() {
                            eprintln!("无法刷新输出: {}", e);
                            break;
                        }
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(Message::Close(_)) => {
                    println!("服务器关闭了连接");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 21 点客户端 ---");
    println!("可用命令:");
    println!("  bet <金额>     - 加注");
    println!("  unbet <金额>   - 减注");
    println!("  clear          - 清空下注");
    println!("  deal           - 开始一局");
    println!("  hit            - 要牌");
    println!("  stand          - 停牌");
    println!("  reset          - 结算后立即清桌");
    println!("  show           - 查看牌桌");
    println!("  exit           - 退出");

    loop {
        prompt()?;

        let Some(line) = stdin.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            println!("正在断开连接...");
            break;
        }

        match parse_command(line) {
            Ok(msg) => {
                if tx.send(msg).await.is_err() {
                    eprintln!("连接已断开");
                    break;
                }
            }
            Err(usage) => println!("{}", usage),
        }
    }

    Ok(())
}
