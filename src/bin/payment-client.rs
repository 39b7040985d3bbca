use clap::Parser;
use payment_gateway::client::send_requests;
use payment_gateway::payments::PaymentRequest;

#[derive(Parser)]
#[command(name = "payment-client")]
#[command(about = "Send PAYMENT requests to a running gateway", long_about = None)]
struct Cli {
    /// Gateway address.
    #[arg(short, long, default_value = "localhost:8080")]
    addr: String,

    /// Amount to pay; repeat to send several requests on one connection.
    #[arg(short = 'n', long = "amount", default_value = "2000")]
    amounts: Vec<u64>,

    /// Send this raw line instead of building PAYMENT requests.
    #[arg(long, conflicts_with = "amounts")]
    raw: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let lines: Vec<String> = match cli.raw {
        Some(raw) => vec![raw],
        None => cli
            .amounts
            .iter()
            .map(|&amount| PaymentRequest { amount }.to_line())
            .collect(),
    };

    let responses = send_requests(cli.addr.as_str(), &lines).await?;
    for (request, response) in lines.iter().zip(&responses) {
        println!("{} -> {}", request, response);
    }
    if responses.len() < lines.len() {
        eprintln!("Connection closed after {} of {} responses", responses.len(), lines.len());
    }

    Ok(())
}
