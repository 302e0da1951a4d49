//! Worker boot script rendering.
//!
//! The cloud-init template is a plain text file with `$ip_addr`, `$cpus`
//! and `$domain` placeholders, filled in per tenant and chosen instance.

pub fn render(template: &str, ip_addr: &str, cpus: i32, domain: &str) -> String {
    template
        .replace("$ip_addr", ip_addr)
        .replace("$cpus", &cpus.to_string())
        .replace("$domain", domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_placeholders() {
        let template = "host=$ip_addr slots=$cpus domain=$domain";
        let out = render(template, "10.0.0.5", 8, "workers.example.org");
        assert_eq!(out, "host=10.0.0.5 slots=8 domain=workers.example.org");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        let out = render("$cpus,$cpus", "ip", 2, "d");
        assert_eq!(out, "2,2");
    }

    #[test]
    fn template_without_placeholders_is_untouched() {
        let template = "#cloud-config\nruncmd:\n  - service condor restart\n";
        assert_eq!(render(template, "ip", 4, "d"), template);
    }
}
