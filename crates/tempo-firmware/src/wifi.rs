//! Station-mode WiFi and SNTP

use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{info, warn};
use tempo_core::config::InternetConfig;
use tempo_core::platform::{Network, NetworkError};
use tempo_core::time::{self, NTP_PACKET_SIZE, NTP_PORT, NTP_SERVER};

const CONNECT_RETRY: Duration = Duration::from_millis(300);
const NTP_TIMEOUT: Duration = Duration::from_secs(5);
const NTP_LOCAL_PORT: u16 = 50_123;

pub struct WifiNetwork {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    credentials: InternetConfig<'static>,
}

impl WifiNetwork {
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        credentials: InternetConfig<'static>,
    ) -> Self {
        Self {
            controller,
            stack,
            credentials,
        }
    }
}

impl Network for WifiNetwork {
    /// Blocks until associated and holding a DHCP lease.
    async fn connect(&mut self) -> Result<(), NetworkError> {
        if !matches!(self.controller.is_started(), Ok(true)) {
            let config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(self.credentials.ssid.into())
                    .with_password(self.credentials.password.into()),
            );
            self.controller
                .set_config(&config)
                .map_err(|_| NetworkError::Connect("station config rejected"))?;
            self.controller
                .start_async()
                .await
                .map_err(|_| NetworkError::Connect("radio failed to start"))?;
        }

        info!("[Wi-Fi] Connecting to {}...", self.credentials.ssid);
        while let Err(e) = self.controller.connect_async().await {
            warn!("[Wi-Fi] Waiting for connection: {:?}", e);
            Timer::after(CONNECT_RETRY).await;
        }

        self.stack.wait_config_up().await;
        if let Some(config) = self.stack.config_v4() {
            info!("[Wi-Fi] Connected with IP: {}", config.address);
        }
        Ok(())
    }

    async fn sync_time(&mut self) -> Result<u64, NetworkError> {
        let addrs = self
            .stack
            .dns_query(NTP_SERVER, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::TimeSync("NTP server lookup failed"))?;
        let server = *addrs
            .first()
            .ok_or(NetworkError::TimeSync("NTP server has no address"))?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buf = [0u8; 2 * NTP_PACKET_SIZE];
        let mut tx_buf = [0u8; 2 * NTP_PACKET_SIZE];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buf,
            &mut tx_meta,
            &mut tx_buf,
        );
        socket
            .bind(NTP_LOCAL_PORT)
            .map_err(|_| NetworkError::TimeSync("UDP bind failed"))?;

        socket
            .send_to(&time::ntp_request(), (server, NTP_PORT))
            .await
            .map_err(|_| NetworkError::TimeSync("NTP request not sent"))?;

        let mut reply = [0u8; NTP_PACKET_SIZE];
        let (len, _) = with_timeout(NTP_TIMEOUT, socket.recv_from(&mut reply))
            .await
            .map_err(|_| NetworkError::TimeSync("no NTP reply"))?
            .map_err(|_| NetworkError::TimeSync("NTP reply truncated"))?;

        time::parse_ntp_response(&reply[..len])
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.controller.disconnect_async().await {
            warn!("[Wi-Fi] Disconnect error (may already be disconnected): {:?}", e);
        }
        if let Err(e) = self.controller.stop_async().await {
            warn!("[Wi-Fi] Stop error: {:?}", e);
        }
        info!("[Wi-Fi] Radio off");
    }
}
