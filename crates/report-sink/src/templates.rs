use scanner_core::{BankruptcyRisk, Candidate, ScanReport};

pub struct ReportTemplate;

impl ReportTemplate {
    pub fn render(report: &ScanReport) -> String {
        let body_content = if report.is_empty() {
            r#"<div style="padding:16px 20px;">
  <p style="color:#334155;margin:0;">No new candidates matched the scan criteria today.</p>
</div>"#
                .to_string()
        } else {
            let rows: String = report
                .candidates
                .iter()
                .enumerate()
                .map(|(i, c)| render_row(i, c))
                .collect();
            format!(
                r#"<table style="width:100%;border-collapse:collapse;">
  <tr style="background:#f8fafc;">
    <th style="padding:8px 12px;text-align:left;color:#64748b;font-size:13px;">Ticker &amp; Broker</th>
    <th style="padding:8px 12px;text-align:left;color:#64748b;font-size:13px;">Drop</th>
    <th style="padding:8px 12px;text-align:left;color:#64748b;font-size:13px;">Potential Gain</th>
    <th style="padding:8px 12px;text-align:left;color:#64748b;font-size:13px;">Price</th>
    <th style="padding:8px 12px;text-align:left;color:#64748b;font-size:13px;">Risk</th>
  </tr>
  {rows}
</table>
<div style="margin:16px 20px;padding:12px 16px;background:#fef3c7;border-left:4px solid #f59e0b;border-radius:4px;color:#334155;font-size:13px;">
  Do your own research before investing. A large drop is not by itself a reason to buy.
</div>"#
            )
        };

        let meta = &report.metadata;
        let errors_html = if meta.error_count == 0 {
            String::new()
        } else {
            format!("<br>{} tickers failed to load", meta.error_count)
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f1f5f9;padding:32px 0;">
  <tr><td align="center">
    <table width="900" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
      <tr><td>
        <div style="background:#1e40af;color:#fff;padding:12px 20px;font-size:18px;font-weight:700;">{headline}</div>
        {body_content}
      </td></tr>
      <tr><td style="padding:16px 20px;border-top:1px solid #e2e8f0;">
        <p style="margin:0;color:#94a3b8;font-size:12px;">
          Scanned {scanned} tickers, {qualified} with a qualifying drop{errors_html}
          <br>Generated at {ts} UTC
        </p>
      </td></tr>
    </table>
    <p style="color:#94a3b8;font-size:11px;margin-top:16px;">Fallen Angel Scanner &middot; {markets}</p>
  </td></tr>
</table>
</body>
</html>"#,
            headline = escape(&report.headline()),
            scanned = meta.tickers_scanned,
            qualified = meta.tickers_qualified,
            ts = meta.started_at.format("%Y-%m-%d %H:%M:%S"),
            markets = "US &middot; WSE &middot; LSE &middot; TASE &middot; XETRA",
        )
    }
}

fn render_row(index: usize, c: &Candidate) -> String {
    let stripe = if index % 2 == 1 {
        r#" style="background:#f8fafc;""#
    } else {
        ""
    };
    let ticker = escape(&c.ticker);
    let market = c.market.label();
    let broker = c.market.broker();
    let alternative = broker
        .alternative
        .map(|alt| {
            format!(
                r#"<span style="background:#9ca3af;color:#fff;padding:2px 8px;border-radius:3px;font-size:10px;margin-left:4px;">or {alt}</span>"#
            )
        })
        .unwrap_or_default();
    let broker_color = broker_color(broker.primary);
    let risk_color = risk_color(c.risk.bankruptcy_risk);
    let drop = c.drop.cumulative_drop_pct * 100.0;
    let gain = c.potential_gain_pct * 100.0;
    let price = c.drop.current_price;
    let currency = c.market.currency();
    let score = c.risk.risk_score;
    let label = c.risk.bankruptcy_risk.label();
    let primary = broker.primary;

    format!(
        r#"<tr{stripe}>
    <td style="padding:8px 12px;">
      <div style="font-weight:600;">{ticker}<span style="background:#3b82f6;color:#fff;padding:2px 6px;border-radius:3px;font-size:11px;margin-left:4px;">{market}</span></div>
      <div style="margin-top:4px;"><span style="background:{broker_color};color:#fff;padding:2px 8px;border-radius:3px;font-size:10px;">{primary}</span>{alternative}</div>
    </td>
    <td style="padding:8px 12px;font-weight:600;color:#ef4444;">-{drop:.1}%</td>
    <td style="padding:8px 12px;font-weight:600;color:#22c55e;">+{gain:.1}%</td>
    <td style="padding:8px 12px;font-size:12px;">{price:.2} {currency}</td>
    <td style="padding:8px 12px;"><span style="background:{risk_color};color:#fff;padding:4px 8px;border-radius:4px;font-size:12px;">{score:.1}/10 {label}</span></td>
  </tr>
"#
    )
}

fn risk_color(risk: BankruptcyRisk) -> &'static str {
    match risk {
        BankruptcyRisk::VeryLow => "#22c55e",
        BankruptcyRisk::Low => "#84cc16",
        BankruptcyRisk::Medium => "#eab308",
        BankruptcyRisk::High => "#ef4444",
    }
}

fn broker_color(primary: &str) -> &'static str {
    match primary {
        "Revolut" => "#10b981",
        "mBank eMakler" => "#3b82f6",
        _ => "#f59e0b",
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
