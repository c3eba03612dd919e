//! 会话协议 Codec
//!
//! 使用 JSON 序列化，带 u32 大端长度前缀的分帧协议。

use async_trait::async_trait;
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use libp2p::{request_response, StreamProtocol};

use super::message::{SessionMessage, SessionResponse, CHAT_PROTOCOL};

/// 请求最大字节数
const MAX_REQUEST_SIZE: usize = 64 * 1024;

/// 响应最大字节数
const MAX_RESPONSE_SIZE: usize = 1024;

/// 获取聊天协议标识
pub fn chat_protocol() -> StreamProtocol {
    StreamProtocol::new(CHAT_PROTOCOL)
}

/// 会话 Codec
#[derive(Debug, Clone, Default)]
pub struct SessionCodec;

async fn read_frame<T>(io: &mut T, max_size: usize) -> std::io::Result<Vec<u8>>
where
    T: AsyncRead + Unpin + Send,
{
    let mut len_bytes = [0u8; 4];
    io.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("帧过大: {} 字节", len),
        ));
    }

    let mut buffer = vec![0u8; len];
    io.read_exact(&mut buffer).await?;
    Ok(buffer)
}

async fn write_frame<T>(io: &mut T, data: &[u8]) -> std::io::Result<()>
where
    T: AsyncWrite + Unpin + Send,
{
    let len = data.len() as u32;
    io.write_all(&len.to_be_bytes()).await?;
    io.write_all(data).await?;
    io.flush().await
}

#[async_trait]
impl request_response::Codec for SessionCodec {
    type Protocol = StreamProtocol;
    type Request = SessionMessage;
    type Response = SessionResponse;

    async fn read_request<T>(
        &mut self,
        _protocol: &Self::Protocol,
        io: &mut T,
    ) -> std::io::Result<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        let buffer = read_frame(io, MAX_REQUEST_SIZE).await?;
        serde_json::from_slice::<SessionMessage>(&buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    async fn read_response<T>(
        &mut self,
        _protocol: &Self::Protocol,
        io: &mut T,
    ) -> std::io::Result<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        let buffer = read_frame(io, MAX_RESPONSE_SIZE).await?;
        serde_json::from_slice::<SessionResponse>(&buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    async fn write_request<T>(
        &mut self,
        _protocol: &Self::Protocol,
        io: &mut T,
        req: Self::Request,
    ) -> std::io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let data = serde_json::to_vec(&req)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_frame(io, &data).await
    }

    async fn write_response<T>(
        &mut self,
        _protocol: &Self::Protocol,
        io: &mut T,
        res: Self::Response,
    ) -> std::io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let data = serde_json::to_vec(&res)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_frame(io, &data).await
    }
}
